//! Entry point: reads an `.osm` XML planet file, resolves geometry for
//! closed ways and multipolygon relations, and streams rows in PostgreSQL
//! COPY text format.
//!
//! Wiring follows spec section 5's phase structure even though it all runs
//! against one sequential decoder (see `pipeline::decoder_pool`): nodes
//! populate `NodeStore`, then ways resolve against it (and feed
//! `WayStore` for anything a later relation might reference), then
//! relations assemble multipolygons out of `WayStore` entries. Only row
//! writing is handed off to a worker pool, since rows carry no ordering
//! constraint.

use std::fs::File;
use std::io::{stdout, BufReader};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;

use osm_planet_loader::config::Config;
use osm_planet_loader::filter::{default_area_filter, is_area_way, is_multipolygon_relation, is_point_candidate};
use osm_planet_loader::geometry::{self, GeometryFactory, OutputEncoding, Role, WayInput};
use osm_planet_loader::location::Location;
use osm_planet_loader::osm::{Primitive, XmlSource};
use osm_planet_loader::pipeline::{spawn_decoder, spawn_worker_pool, QueueItem};
use osm_planet_loader::stats::{Counters, OrderChecker, PrimitiveKind};
use osm_planet_loader::store::{NodeStore, WayStore};
use osm_planet_loader::tags::TagList;
use osm_planet_loader::writer::copy_text::CopyTextWriter;
use osm_planet_loader::writer::{OutputRow, RowSink, WriterError};

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::parse();
    run(&config).map_err(|e| {
        log::error!("import failed: {e}");
        e
    })
}

fn run(config: &Config) -> Result<()> {
    let file = File::open(&config.input)
        .with_context(|| format!("opening input file {}", config.input.display()))?;
    let source = XmlSource::new(BufReader::new(file));

    // Both shipped `RowSink`s expect ASCII geometry (COPY text format can't
    // carry raw binary), so hex is the only encoding this binary ever uses.
    let factory = GeometryFactory::new(config.projection_srid, OutputEncoding::Hex);
    let area_filter = default_area_filter();

    let sink = CopyTextWriter::new(stdout());
    let sink: Arc<Mutex<dyn RowSink + Send>> = Arc::new(Mutex::new(sink));

    let writer_threads = config.writer_threads();
    let (row_sender, row_receiver) = crossbeam_channel::bounded::<QueueItem<OutputRow>>(1024);
    let writer_sink = Arc::clone(&sink);
    let writer_handles = spawn_worker_pool(row_receiver, writer_threads, move |row: OutputRow| {
        writer_sink
            .lock()
            .expect("writer mutex poisoned")
            .write_row(&row)
            .map_err(write_error_to_pipeline)
    });

    let (decoder_receiver, decoder_handle) = spawn_decoder(source, 2048, 64, 1);

    let mut node_store = NodeStore::new(config.cache_strategy.into(), config.cache_size_mb as u64, config.lossy_cache);
    let mut way_store = WayStore::new(config.max_ways_in_ram);
    let mut order_checker = OrderChecker::new();
    let mut counters = Counters::new();

    let mut fatal: Option<anyhow::Error> = None;

    'outer: loop {
        match decoder_receiver.recv() {
            Ok(QueueItem::Shutdown) => break,
            Ok(QueueItem::Item(Err(e))) => {
                fatal = Some(anyhow::anyhow!(e.to_string()));
                break;
            }
            Ok(QueueItem::Item(Ok(batch))) => {
                for primitive in batch.primitives {
                    if let Err(e) = process_primitive(
                        primitive,
                        config,
                        &factory,
                        &area_filter,
                        &mut node_store,
                        &mut way_store,
                        &mut order_checker,
                        &mut counters,
                        &row_sender,
                    ) {
                        fatal = Some(e);
                        break 'outer;
                    }
                }
            }
            Err(_) => break,
        }
    }

    let _ = decoder_handle.join();

    for _ in 0..writer_threads {
        let _ = row_sender.send(QueueItem::Shutdown);
    }
    for handle in writer_handles {
        if let Ok(Err(e)) = handle.join() {
            if fatal.is_none() {
                fatal = Some(anyhow::anyhow!(e.to_string()));
            }
        }
    }

    sink.lock().expect("writer mutex poisoned").finish().context("flushing output")?;

    node_store.log_summary();
    counters.log_summary();

    if let Some(e) = fatal {
        return Err(e);
    }
    Ok(())
}

fn write_error_to_pipeline(e: WriterError) -> osm_planet_loader::errors::PipelineError {
    osm_planet_loader::errors::ResourceError::Db(e.to_string()).into()
}

#[allow(clippy::too_many_arguments)]
fn process_primitive(
    primitive: Primitive,
    config: &Config,
    factory: &GeometryFactory,
    area_filter: &osm_planet_loader::filter::TagFilter<bool>,
    node_store: &mut NodeStore,
    way_store: &mut WayStore,
    order_checker: &mut OrderChecker,
    counters: &mut Counters,
    row_sender: &crossbeam_channel::Sender<QueueItem<OutputRow>>,
) -> Result<()> {
    match primitive {
        Primitive::Node(node) => {
            order_checker.check(PrimitiveKind::Node, node.id);
            counters.nodes += 1;
            node_store
                .set(node.id, node.location)
                .with_context(|| format!("storing node {}", node.id))?;

            if is_point_candidate(&node.tags) {
                let geometry_hex = factory.point(node.location);
                send_row(row_sender, node.id, node.tags, geometry_hex, config.projection_srid)?;
            }
        }
        Primitive::Way(way) => {
            order_checker.check(PrimitiveKind::Way, way.id);
            counters.ways += 1;

            let locations: Vec<Option<Location>> = way.node_ids.iter().map(|id| node_store.get(*id)).collect();
            if way.node_ids.len() < 2 {
                counters.short_ways += 1;
            } else {
                let closed = way.node_ids.first() == way.node_ids.last();
                let area_tagged = is_area_way(area_filter, &way.tags);

                if closed && area_tagged {
                    let input = WayInput { way_id: way.id, locations, role: Role::Outer };
                    let outcome = geometry::assemble(&[input], config.ignore_invalid_locations);
                    counters.record_assembly(&outcome.stats);

                    match outcome.geometry {
                        Some(mp) => {
                            let geometry_hex = factory
                                .area_geometry(&mp, config.build_multigeoms)
                                .with_context(|| format!("encoding way {}", way.id))?;
                            send_row(row_sender, way.id, way.tags.clone(), geometry_hex, config.projection_srid)?;
                        }
                        None if config.create_empty_areas => {
                            send_row(row_sender, way.id, way.tags.clone(), Vec::new(), config.projection_srid)?;
                        }
                        None => {}
                    }
                } else {
                    let resolved: Vec<Location> = locations.iter().filter_map(|l| *l).collect();
                    if resolved.len() >= 2 {
                        let geometry_hex = factory
                            .linestring(&resolved)
                            .with_context(|| format!("encoding way {}", way.id))?;
                        send_row(row_sender, way.id, way.tags.clone(), geometry_hex, config.projection_srid)?;
                    }
                }
            }

            way_store.insert(way.id, way.node_ids, way.tags);
        }
        Primitive::Relation(relation) => {
            order_checker.check(PrimitiveKind::Relation, relation.id);
            counters.relations += 1;

            if !is_multipolygon_relation(&relation.tags) {
                return Ok(());
            }

            let mut inputs = Vec::new();
            let mut seen_way_ids = std::collections::HashSet::new();
            for member in &relation.members {
                if member.kind != osm_planet_loader::osm::MemberKind::Way {
                    continue;
                }
                if !seen_way_ids.insert(member.id) {
                    counters.duplicate_ways += 1;
                    continue;
                }
                if let Some(stored) = way_store.get(member.id) {
                    let locations: Vec<Option<Location>> =
                        stored.node_ids.iter().map(|id| node_store.get(*id)).collect();
                    let role = match member.role.as_str() {
                        "outer" => Role::Outer,
                        "inner" => Role::Inner,
                        "" => Role::Empty,
                        _ => Role::Unknown,
                    };
                    inputs.push(WayInput { way_id: member.id, locations, role });
                }
            }

            if inputs.is_empty() {
                counters.no_way_in_mp_relation += 1;
                return Ok(());
            }
            if inputs.len() == 1 {
                counters.single_way_in_mp_relation += 1;
            }

            let outcome = geometry::assemble(&inputs, config.ignore_invalid_locations);
            counters.record_assembly(&outcome.stats);

            let mut tags = relation.tags;
            if !config.keep_type_tag {
                tags.remove("type");
            }

            match outcome.geometry {
                Some(mp) => {
                    let geometry_hex = factory
                        .area_geometry(&mp, config.build_multigeoms)
                        .with_context(|| format!("encoding relation {}", relation.id))?;
                    send_row(row_sender, relation.id, tags, geometry_hex, config.projection_srid)?;
                }
                None if config.create_empty_areas => {
                    send_row(row_sender, relation.id, tags, Vec::new(), config.projection_srid)?;
                }
                None => {}
            }
        }
    }
    Ok(())
}

fn send_row(
    row_sender: &crossbeam_channel::Sender<QueueItem<OutputRow>>,
    id: i64,
    tags: TagList,
    geometry_hex: Vec<u8>,
    srid: i32,
) -> Result<()> {
    let row = OutputRow { id, tags, geometry_hex, srid };
    row_sender
        .send(QueueItem::ok(row))
        .map_err(|_| anyhow::anyhow!("writer pool hung up"))
}
