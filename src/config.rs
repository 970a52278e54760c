//! Command-line configuration, loaded via `clap`'s derive API.
//!
//! The option surface is osm2pgsql's (`options.cpp`/`settings.hpp`); the
//! mechanism — a single `#[derive(Parser)]` struct parsed once in `main` —
//! is the teacher's `clap` usage generalized from its two positional
//! arguments to this crate's full option set.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::store::CacheStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheStrategyArg {
    Dense,
    Sparse,
    Chunk,
    Optimized,
}

impl From<CacheStrategyArg> for CacheStrategy {
    fn from(arg: CacheStrategyArg) -> CacheStrategy {
        match arg {
            CacheStrategyArg::Dense => CacheStrategy::Dense,
            CacheStrategyArg::Sparse => CacheStrategy::Sparse,
            CacheStrategyArg::Chunk => CacheStrategy::Chunk,
            CacheStrategyArg::Optimized => CacheStrategy::Optimized,
        }
    }
}

/// Imports an OSM planet file into a PostGIS-ready relational representation.
#[derive(Debug, Parser)]
#[command(name = "osm-import", about)]
pub struct Config {
    /// Input `.osm`/`.xml` file.
    pub input: PathBuf,

    /// NodeStore memory budget, in megabytes.
    #[arg(long, default_value_t = 800)]
    pub cache_size_mb: usize,

    /// NodeStore allocation strategy.
    #[arg(long, value_enum, default_value_t = CacheStrategyArg::Optimized)]
    pub cache_strategy: CacheStrategyArg,

    /// Silently drop nodes once the cache is full, instead of failing.
    #[arg(long)]
    pub lossy_cache: bool,

    /// Skip primitives with unresolved node references instead of
    /// aborting the enclosing assembly.
    #[arg(long)]
    pub ignore_invalid_locations: bool,

    /// Emit tags-only rows for areas whose geometry failed to assemble.
    #[arg(long)]
    pub create_empty_areas: bool,

    /// Retain the relation's `type=multipolygon` tag on output.
    #[arg(long)]
    pub keep_type_tag: bool,

    /// Always emit MULTIPOLYGON, even for single-polygon results.
    #[arg(long)]
    pub build_multigeoms: bool,

    /// SRID stamped into every EWKB header.
    #[arg(long, default_value_t = 4326)]
    pub projection_srid: i32,

    /// Maximum ways kept resident for relation assembly (unbounded if unset).
    #[arg(long)]
    pub max_ways_in_ram: Option<usize>,

    /// Number of decoder worker threads.
    #[arg(long)]
    pub decoder_threads: Option<usize>,

    /// Number of writer worker threads.
    #[arg(long)]
    pub writer_threads: Option<usize>,
}

impl Config {
    pub fn decoder_threads(&self) -> usize {
        self.decoder_threads.unwrap_or_else(|| num_cpus::get().max(1))
    }

    pub fn writer_threads(&self) -> usize {
        self.writer_threads.unwrap_or_else(|| num_cpus::get().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults_match_spec() {
        let config = Config::parse_from(["osm-import", "planet.osm"]);
        assert_eq!(config.cache_size_mb, 800);
        assert_eq!(config.cache_strategy, CacheStrategyArg::Optimized);
        assert!(!config.lossy_cache);
        assert_eq!(config.projection_srid, 4326);
    }
}
