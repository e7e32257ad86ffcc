//! Builds a small irregular world in memory and converts it tick by tick.
//!
//! Usage: convert_world [size] [batch_size] [format]
//! Logging follows RUST_LOG, e.g. `RUST_LOG=convertworld=debug`.

use convertworld::chunk::{BlockCell, ChunkCoord, ChunkData, CHUNK_SIZE};
use convertworld::code_table::{CodeRemapTable, EditionTables};
use convertworld::config::ConverterConfig;
use convertworld::memory::MemoryHost;
use convertworld::request::ConversionRequest;
use convertworld::scheduler::ConversionScheduler;
use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const JE_TO_BE: &str = include_str!("je_to_be.json");

fn build_world(host: &mut MemoryHost, size: i32) {
    host.add_world("world", "anvil", 20240601, "default");
    for x in 0..size {
        for z in 0..size {
            // a lake of missing chunks in the middle
            if (x - size / 2).abs() + (z - size / 2).abs() < size / 6 {
                continue;
            }
            let coord = ChunkCoord::new(x, z);
            let mut chunk = ChunkData::new(coord, 4);
            for y in 0..48 {
                for lz in 0..CHUNK_SIZE {
                    for lx in 0..CHUNK_SIZE {
                        let cell = match y {
                            0 => BlockCell::new(7, 0),
                            1..=44 => BlockCell::new(1, 0),
                            45..=46 => BlockCell::new(3, 0),
                            _ => BlockCell::new(125, ((lx + lz) % 6) as u8),
                        };
                        chunk.set_block(lx, y, lz, cell);
                    }
                }
            }
            chunk.recalculate_height_map();
            if let Err(e) = host.put_chunk("world", chunk) {
                eprintln!("Failed to store chunk {}: {}", coord, e);
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let size: i32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(24);
    let batch_size: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(200);
    let format = args.next().unwrap_or_else(|| "leveldb".to_string());

    let je_to_be = CodeRemapTable::from_json(JE_TO_BE).expect("Invalid remap table");
    let tables = EditionTables::new(je_to_be.clone(), je_to_be.inverted());
    let table = tables.select("je", "be").expect("Unsupported edition pair");

    let mut host = MemoryHost::new();
    build_world(&mut host, size);
    println!("Source world: {} chunks", host.stored_coords("world").len());

    let config = ConverterConfig {
        batch_size,
        ..ConverterConfig::default()
    };
    let mut scheduler = ConversionScheduler::with_config(config).expect("Invalid config");

    let done = Rc::new(Cell::new(false));
    let done_flag = done.clone();
    let request = ConversionRequest::new("world", "world_be", format)
        .with_code_table(table)
        .on_chunk_converted(|coord| {
            print!("Convert chunk ... {}\r", coord);
            let _ = std::io::stdout().flush();
        })
        .on_finished(move |summary| {
            println!(
                "\nSuccessfully converted: {} chunks, {} empty probes, {} cells remapped",
                summary.chunks_converted, summary.chunks_probed, summary.cells_rewritten
            );
            done_flag.set(true);
        });

    if let Err(e) = scheduler.request_conversion(&mut host, request) {
        eprintln!("Conversion refused: {}", e);
        std::process::exit(1);
    }

    let mut ticks = 0;
    while !done.get() {
        scheduler.tick(&mut host);
        ticks += 1;
    }

    let stats = host.stats();
    println!(
        "{} ticks, {} chunk loads, {} writes flushed, peak {} resident chunks",
        ticks,
        stats.chunk_loads,
        stats.flushed,
        host.peak_resident()
    );
}
