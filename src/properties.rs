//! Reading and writing the `<basename>.properties` artifact (spec §6).
//!
//! The format is a plain UTF-8 `key = value` text file, one entry per line,
//! with `#`-prefixed comments — simple enough that we parse and serialize it
//! by hand rather than pulling in a full Java-properties-compatible parser
//! (this crate does not need escaping or interop with the original Java
//! format; see DESIGN.md).

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::bits::Codes;
use crate::error::{Error, Result};

/// Compression parameters: window size, maximum reference-chain depth,
/// minimum interval length, and the universal code chosen for each field of
/// the record (spec §4.3's "Parameter defaults").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompFlags {
    pub outdegrees: Codes,
    pub references: Codes,
    pub blocks: Codes,
    pub intervals: Codes,
    pub residuals: Codes,
    pub min_interval_length: usize,
    pub compression_window: usize,
    pub max_ref_count: usize,
}

impl Default for CompFlags {
    fn default() -> Self {
        CompFlags {
            outdegrees: Codes::Gamma,
            references: Codes::Unary,
            blocks: Codes::Gamma,
            intervals: Codes::Gamma,
            residuals: Codes::Zeta(3),
            min_interval_length: 4,
            compression_window: 7,
            max_ref_count: 3,
        }
    }
}

impl CompFlags {
    /// The `k` used by `residuals` if it is `Codes::Zeta(k)`, otherwise the
    /// default `zetak` value written to `.properties` for informational
    /// purposes.
    fn zeta_k(&self) -> u8 {
        for c in [
            self.outdegrees,
            self.references,
            self.blocks,
            self.intervals,
            self.residuals,
        ] {
            if let Codes::Zeta(k) = c {
                return k;
            }
        }
        3
    }

    /// Renders the `compressionflags` value: a comma-separated list drawn
    /// from `{OUTDEGREES,REFERENCES,BLOCKS,INTERVALS,RESIDUALS}_{CODE}`,
    /// omitting fields that are at their default.
    fn compression_flags_value(&self) -> String {
        let default = CompFlags::default();
        let mut flags = Vec::new();
        if self.outdegrees != default.outdegrees {
            flags.push(format!("OUTDEGREES_{}", self.outdegrees.name()));
        }
        if self.references != default.references {
            flags.push(format!("REFERENCES_{}", self.references.name()));
        }
        if self.blocks != default.blocks {
            flags.push(format!("BLOCKS_{}", self.blocks.name()));
        }
        if self.intervals != default.intervals {
            flags.push(format!("INTERVALS_{}", self.intervals.name()));
        }
        if self.residuals != default.residuals {
            flags.push(format!("RESIDUALS_{}", self.residuals.name()));
        }
        flags.join(",")
    }

    fn from_compression_flags_value(value: &str, k: u8) -> Result<CompFlags> {
        let mut cf = CompFlags::default();
        if value.is_empty() {
            return Ok(cf);
        }
        for flag in value.split(',') {
            let flag = flag.trim();
            if flag.is_empty() {
                continue;
            }
            let (field, code_name) = flag.split_once('_').ok_or_else(|| {
                Error::UnsupportedVersion(format!("malformed compressionflags entry {flag:?}"))
            })?;
            let code = Codes::parse(code_name, k).ok_or_else(|| {
                Error::UnsupportedVersion(format!("unknown code {code_name:?} in {flag:?}"))
            })?;
            match field {
                "OUTDEGREES" => cf.outdegrees = code,
                "REFERENCES" => cf.references = code,
                "BLOCKS" => cf.blocks = code,
                "INTERVALS" => cf.intervals = code,
                "RESIDUALS" => cf.residuals = code,
                _ => {
                    return Err(Error::UnsupportedVersion(format!(
                        "unknown compression flag field {field:?}"
                    )));
                }
            }
        }
        Ok(cf)
    }
}

/// Everything decoded from a `.properties` file: the graph's node/arc count
/// plus its [`CompFlags`].
#[derive(Debug, Clone)]
pub struct Properties {
    pub num_nodes: usize,
    pub num_arcs: u64,
    pub comp_flags: CompFlags,
}

const GRAPH_CLASS: &str = "bvgraph.BVGraph";
const VERSION: u32 = 0;

pub fn write<P: AsRef<Path>>(
    path: P,
    num_nodes: usize,
    num_arcs: u64,
    comp_flags: &CompFlags,
    bitstream_len: u64,
) -> Result<()> {
    let mut f = std::fs::File::create(path.as_ref())?;
    writeln!(f, "# BVGraph properties")?;
    writeln!(f, "graphclass = {GRAPH_CLASS}")?;
    writeln!(f, "version = {VERSION}")?;
    writeln!(f, "nodes = {num_nodes}")?;
    writeln!(f, "arcs = {num_arcs}")?;
    writeln!(f, "windowsize = {}", comp_flags.compression_window)?;
    writeln!(f, "maxrefcount = {}", comp_flags.max_ref_count)?;
    writeln!(f, "minintervallength = {}", comp_flags.min_interval_length)?;
    writeln!(f, "zetak = {}", comp_flags.zeta_k())?;
    writeln!(f, "compressionflags = {}", comp_flags.compression_flags_value())?;
    writeln!(f, "length = {bitstream_len}")?;
    if num_arcs > 0 {
        writeln!(
            f,
            "bitsperlink = {}",
            bitstream_len as f64 / num_arcs as f64
        )?;
    }
    if num_nodes > 0 {
        writeln!(
            f,
            "bitspernode = {}",
            bitstream_len as f64 / num_nodes as f64
        )?;
    }
    Ok(())
}

/// Parses a `.properties` file into a flat `key -> value` map, stripping
/// `#` comments and surrounding whitespace.
fn read_map<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let f = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    let mut map = BTreeMap::new();
    for line in std::io::BufReader::new(f).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<Properties> {
    let path = path.as_ref();
    let map = read_map(path)?;

    let missing = |key: &str| {
        Error::UnsupportedVersion(format!(
            "{}: missing required key {key:?} (this crate requires all keys to be \
             present explicitly rather than falling back to undocumented defaults)",
            path.display()
        ))
    };
    let parse_usize = |key: &str, v: &str| {
        v.parse::<usize>().map_err(|_| {
            Error::UnsupportedVersion(format!("{}: {key}={v:?} is not a valid integer", path.display()))
        })
    };

    let graphclass = map.get("graphclass").ok_or_else(|| missing("graphclass"))?;
    if graphclass != GRAPH_CLASS {
        return Err(Error::UnsupportedVersion(format!(
            "unrecognized graphclass {graphclass:?}"
        )));
    }
    let version = map.get("version").ok_or_else(|| missing("version"))?;
    if parse_usize("version", version)? as u32 != VERSION {
        return Err(Error::UnsupportedVersion(format!(
            "unsupported codec version {version}"
        )));
    }

    let num_nodes = parse_usize("nodes", map.get("nodes").ok_or_else(|| missing("nodes"))?)?;
    let num_arcs = map
        .get("arcs")
        .ok_or_else(|| missing("arcs"))?
        .parse::<u64>()
        .map_err(|_| Error::UnsupportedVersion(format!("{}: arcs is not a valid integer", path.display())))?;

    let k = parse_usize("zetak", map.get("zetak").ok_or_else(|| missing("zetak"))?)? as u8;
    if !(1..=7).contains(&k) {
        return Err(Error::UnsupportedVersion(format!("zetak={k} out of range [1,7]")));
    }

    let flags_value = map
        .get("compressionflags")
        .ok_or_else(|| missing("compressionflags"))?;
    let mut comp_flags = CompFlags::from_compression_flags_value(flags_value, k)?;
    comp_flags.compression_window = parse_usize(
        "windowsize",
        map.get("windowsize").ok_or_else(|| missing("windowsize"))?,
    )?;
    comp_flags.max_ref_count = parse_usize(
        "maxrefcount",
        map.get("maxrefcount").ok_or_else(|| missing("maxrefcount"))?,
    )?;
    comp_flags.min_interval_length = parse_usize(
        "minintervallength",
        map.get("minintervallength")
            .ok_or_else(|| missing("minintervallength"))?,
    )?;

    Ok(Properties {
        num_nodes,
        num_arcs,
        comp_flags,
    })
}
