//! Text parsing for `.cfg` configuration files and `.trc` address traces

use anyhow::{anyhow, bail, Context, Result};
use core_sim::{addr::Addr, geometry::Associativity};
use nom::{
    bytes::complete::{tag, take_until},
    character::complete::hex_digit1,
    combinator::{map_res, opt},
    sequence::preceded,
    IResult,
};

pub struct RawConfig {
    pub cache_size: u32,
    pub block_size: u32,
    pub associativity: Associativity,
}

/// parses the `Key=Value` configuration format. `Cache Size`,
/// `Block Size`, and `Associativity` are all required; order is free.
pub fn parse_config(input: &str) -> Result<RawConfig> {
    let mut cache_size = None;
    let mut block_size = None;
    let mut associativity = None;
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = key_value(line)
            .map(|(_, kv)| kv)
            .map_err(|_| anyhow!("malformed config line {}: `{line}`", lineno + 1))?;
        match key {
            "Cache Size" => cache_size = Some(parse_size(key, value)?),
            "Block Size" => block_size = Some(parse_size(key, value)?),
            "Associativity" => associativity = Some(value.parse::<Associativity>()?),
            _ => bail!("unknown config key `{key}`"),
        }
    }
    Ok(RawConfig {
        cache_size: cache_size.context("config is missing `Cache Size`")?,
        block_size: block_size.context("config is missing `Block Size`")?,
        associativity: associativity.context("config is missing `Associativity`")?,
    })
}

fn key_value(line: &str) -> IResult<&str, (&str, &str)> {
    let (rest, key) = take_until("=")(line)?;
    let (value, _) = tag("=")(rest)?;
    Ok(("", (key.trim(), value.trim())))
}

fn parse_size(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .with_context(|| format!("`{key}` is not a positive integer: `{value}`"))
}

/// parses a trace: one hex address per line (optional `0x` prefix),
/// blank lines skipped. an address wider than 32 bits is rejected here,
/// at the boundary, so the core never sees one.
pub fn parse_trace(input: &str) -> Result<Vec<Addr>> {
    let mut addrs = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (rest, addr) = hex_addr(line)
            .map_err(|_| anyhow!("malformed trace line {}: `{line}`", lineno + 1))?;
        if !rest.trim().is_empty() {
            bail!("trailing characters on trace line {}: `{line}`", lineno + 1);
        }
        addrs.push(addr);
    }
    Ok(addrs)
}

fn hex_addr(line: &str) -> IResult<&str, Addr> {
    let (rest, v) = preceded(
        opt(tag("0x")),
        map_res(hex_digit1, |d| u32::from_str_radix(d, 16)),
    )(line)?;
    Ok((rest, Addr::new(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let cfg = "Cache Size=1024\nBlock Size=32\nAssociativity=direct\n";
        let c = parse_config(cfg).unwrap();
        assert_eq!(c.cache_size, 1024);
        assert_eq!(c.block_size, 32);
        assert_eq!(c.associativity, Associativity::Direct);
    }

    #[test]
    fn test_parse_config_any_order() {
        let cfg = "Associativity=4\n\nBlock Size=64\nCache Size=8192\n";
        let c = parse_config(cfg).unwrap();
        assert_eq!(c.associativity, Associativity::Ways(4));
        assert_eq!(c.block_size, 64);
    }

    #[test]
    fn test_parse_config_rejects_garbage() {
        assert!(parse_config("Cache Size 1024").is_err());
        assert!(parse_config("Cache Size=1024\nBlock Size=32").is_err());
        assert!(parse_config("Mystery Knob=3").is_err());
        assert!(parse_config("Cache Size=1024\nBlock Size=32\nAssociativity=maybe").is_err());
    }

    #[test]
    fn test_parse_trace() {
        let trc = "0x00000000\n20\n\nDEADBEEF\n";
        let t = parse_trace(trc).unwrap();
        assert_eq!(
            t,
            [Addr::new(0), Addr::new(0x20), Addr::new(0xDEAD_BEEF)]
        );
    }

    #[test]
    fn test_parse_trace_rejects_wide_or_junk() {
        // 9 hex digits exceed a 32-bit address
        assert!(parse_trace("0x100000000").is_err());
        assert!(parse_trace("xyz").is_err());
        assert!(parse_trace("20 trailing").is_err());
    }
}
