#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for inspecting map snapshots and computing routes.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gridpath_core::{Command as MapCommand, EntityId, Event, GridDimensions, TileCoord};
use gridpath_map::config::{self, CategoryConfig, GroupConfig, MapConfig, TileRefConfig};
use gridpath_map::persist::MapSnapshot;
use gridpath_map::{apply, query, Map};

/// Pathfinding and collision playground for tile maps.
#[derive(Parser)]
#[command(name = "gridpath", version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Builds a 10x10 walled scenario and prints the computed detour.
    Demo,
    /// Computes a route across a snapshot and prints its waypoints.
    Route {
        /// Encoded map snapshot (`gridmap:v1:...`).
        #[arg(long)]
        snapshot: String,
        /// Path to the JSON group/category configuration document.
        #[arg(long)]
        config: PathBuf,
        /// Start tile as `column,row`.
        #[arg(long)]
        from: String,
        /// Goal tile as `column,row`.
        #[arg(long)]
        to: String,
        /// Allow 8-connected steps where categories permit them.
        #[arg(long)]
        diagonal: bool,
    },
    /// Prints the dimensions and tile census of a snapshot.
    Inspect {
        /// Encoded map snapshot (`gridmap:v1:...`).
        #[arg(long)]
        snapshot: String,
    },
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        CliCommand::Demo => run_demo(),
        CliCommand::Route {
            snapshot,
            config,
            from,
            to,
            diagonal,
        } => run_route(&snapshot, &config, &from, &to, diagonal),
        CliCommand::Inspect { snapshot } => run_inspect(&snapshot),
    }
}

fn run_route(
    snapshot: &str,
    config_path: &PathBuf,
    from: &str,
    to: &str,
    diagonal: bool,
) -> anyhow::Result<()> {
    let snapshot = MapSnapshot::decode(snapshot).context("could not decode the snapshot")?;
    let document = fs::read_to_string(config_path)
        .with_context(|| format!("could not read {}", config_path.display()))?;
    let config = config::import(&document).context("could not parse the configuration")?;
    let map = Map::from_snapshot(&snapshot, &config).context("could not restore the map")?;

    let start = parse_coord(from).context("invalid --from coordinate")?;
    let goal = parse_coord(to).context("invalid --to coordinate")?;

    match map.compute_path(EntityId::new(0), start, goal, diagonal) {
        Some(path) if path.is_empty() => println!("already at the goal"),
        Some(path) => {
            println!("{} steps:", path.len());
            for waypoint in path {
                println!("  {},{}", waypoint.column(), waypoint.row());
            }
        }
        None => println!("no route found"),
    }
    Ok(())
}

fn run_inspect(snapshot: &str) -> anyhow::Result<()> {
    let snapshot = MapSnapshot::decode(snapshot).context("could not decode the snapshot")?;
    let dimensions = snapshot.dimensions;
    println!(
        "grid: {}x{} tiles of {}x{}",
        dimensions.columns(),
        dimensions.rows(),
        dimensions.tile_width(),
        dimensions.tile_height()
    );
    println!("tiles placed: {}", snapshot.tiles.len());

    let mut census: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for record in &snapshot.tiles {
        *census.entry((record.sheet, record.number)).or_default() += 1;
    }
    for ((sheet, number), count) in census {
        println!("  sheet {sheet} tile {number}: {count}");
    }
    Ok(())
}

const DEMO_GROUND: u32 = 0;
const DEMO_WALL: u32 = 1;

fn run_demo() -> anyhow::Result<()> {
    let dimensions = GridDimensions::new(10, 10, 16, 16);
    let mut map = Map::with_config(dimensions, &demo_config())
        .context("could not build the demo configuration")?;

    // A wall column at x = 5 with a single gap at the top row.
    let mut events = Vec::new();
    for row in 0..10 {
        for column in 0..10 {
            let number = if column == 5 && row != 0 {
                DEMO_WALL
            } else {
                DEMO_GROUND
            };
            let at = TileCoord::new(column, row);
            events.clear();
            apply(
                &mut map,
                MapCommand::PlaceTile {
                    at,
                    sheet: 0,
                    number,
                },
                &mut events,
            );
            if !matches!(events.as_slice(), [Event::TileChanged { .. }]) {
                bail!("demo tile placement rejected at {column},{row}");
            }
        }
    }

    let start = TileCoord::new(2, 4);
    let goal = TileCoord::new(8, 4);
    let Some(path) = map.compute_path(EntityId::new(0), start, goal, false) else {
        bail!("demo scenario should always have a route");
    };

    println!(
        "route {},{} -> {},{} in {} steps:",
        start.column(),
        start.row(),
        goal.column(),
        goal.row(),
        path.len()
    );
    print_grid(&map, start, goal, &path);
    Ok(())
}

fn print_grid(map: &Map, start: TileCoord, goal: TileCoord, path: &[TileCoord]) {
    let dimensions = query::dimensions(map);
    for row in 0..dimensions.rows() {
        let mut line = String::new();
        for column in 0..dimensions.columns() {
            let at = TileCoord::new(column, row);
            let glyph = if at == start {
                'S'
            } else if at == goal {
                'G'
            } else if path.contains(&at) {
                '*'
            } else if map.is_blocked(at, None) {
                '#'
            } else {
                '.'
            };
            line.push(glyph);
        }
        println!("{line}");
    }
}

fn demo_config() -> MapConfig {
    MapConfig {
        groups: vec![
            GroupConfig {
                name: "floor".into(),
                tiles: vec![TileRefConfig {
                    sheet: 0,
                    number: DEMO_GROUND,
                }],
            },
            GroupConfig {
                name: "rock".into(),
                tiles: vec![TileRefConfig {
                    sheet: 0,
                    number: DEMO_WALL,
                }],
            },
        ],
        categories: vec![
            CategoryConfig {
                name: "ground".into(),
                cost: 1.0,
                blocking: false,
                diagonal: true,
                groups: vec!["floor".into()],
                formulas: Vec::new(),
            },
            CategoryConfig {
                name: "wall".into(),
                cost: 0.0,
                blocking: true,
                diagonal: false,
                groups: vec!["rock".into()],
                formulas: Vec::new(),
            },
        ],
    }
}

fn parse_coord(value: &str) -> anyhow::Result<TileCoord> {
    let Some((column, row)) = value.split_once(',') else {
        bail!("expected `column,row`, got '{value}'");
    };
    let column = column.trim().parse::<u32>().context("invalid column")?;
    let row = row.trim().parse::<u32>().context("invalid row")?;
    Ok(TileCoord::new(column, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_parse_from_comma_pairs() {
        assert_eq!(parse_coord("3,4").expect("parse"), TileCoord::new(3, 4));
        assert_eq!(parse_coord(" 0 , 9 ").expect("parse"), TileCoord::new(0, 9));
        assert!(parse_coord("3;4").is_err());
        assert!(parse_coord("3,-1").is_err());
    }

    #[test]
    fn demo_scenario_routes_through_the_gap() {
        let dimensions = GridDimensions::new(10, 10, 16, 16);
        let mut map = Map::with_config(dimensions, &demo_config()).expect("config");
        let mut events = Vec::new();
        for row in 0..10 {
            for column in 0..10 {
                let number = if column == 5 && row != 0 {
                    DEMO_WALL
                } else {
                    DEMO_GROUND
                };
                apply(
                    &mut map,
                    MapCommand::PlaceTile {
                        at: TileCoord::new(column, row),
                        sheet: 0,
                        number,
                    },
                    &mut events,
                );
            }
        }

        let path = map
            .compute_path(EntityId::new(0), TileCoord::new(2, 4), TileCoord::new(8, 4), false)
            .expect("route");
        assert_eq!(path.len(), 14);
        assert!(path.contains(&TileCoord::new(5, 0)));
    }
}
