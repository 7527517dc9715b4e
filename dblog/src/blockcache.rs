/// Block cache usage statistics.
///
/// A two-line section.  The first line identifies the cache and its configured capacity; the
/// capacity is recorded the first time a cache id is seen and never overwritten, so a later
/// dump quoting a different capacity for the same id does not rewrite history.  The second
/// line breaks the cached bytes down by entry role (data blocks, filter blocks, ...), and
/// each role accumulates one `(count, size, portion)` sample per dump.
use crate::dates::Timestamp;
use crate::patterns;
use crate::units::value_by_unit;

use anyhow::{bail, Result};
use std::collections::HashMap;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct RoleStats {
    pub count: u64,
    pub size_bytes: u64,
    pub portion_percent: f64,
}

pub struct Cache {
    capacity_bytes: u64,

    // Roles in first-seen order; there are only a handful per cache.
    roles: Vec<(Ustr, Vec<(Timestamp, RoleStats)>)>,
}

impl Cache {
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn roles(&self) -> &[(Ustr, Vec<(Timestamp, RoleStats)>)] {
        &self.roles
    }

    pub fn role_entries(&self, role: Ustr) -> &[(Timestamp, RoleStats)] {
        self.roles
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    fn push_sample(&mut self, role: Ustr, time: Timestamp, stats: RoleStats) {
        match self.roles.iter_mut().find(|(r, _)| *r == role) {
            Some((_, samples)) => samples.push((time, stats)),
            None => self.roles.push((role, vec![(time, stats)])),
        }
    }
}

pub struct BlockCacheStats {
    caches: HashMap<Ustr, Cache>,
}

impl BlockCacheStats {
    pub fn new() -> BlockCacheStats {
        BlockCacheStats {
            caches: HashMap::new(),
        }
    }

    pub fn is_start_line(line: &str) -> bool {
        patterns::BLOCK_CACHE_STATS_START.is_match(line)
    }

    /// Ingest one block-cache section: the cache-id line followed by the roles line.  A
    /// section cut short before the roles line is skipped without storing anything.

    pub fn ingest(&mut self, time: Timestamp, _cf: Ustr, lines: &[&str]) -> Result<()> {
        if lines.len() < 2 {
            return Ok(());
        }
        let cache_id = self.parse_cache_id_line(lines[0])?;
        self.parse_role_stats_line(time, cache_id, lines[1])
    }

    // Record the cache and its capacity (first write wins), returning the id.

    fn parse_cache_id_line(&mut self, line: &str) -> Result<Ustr> {
        let caps = match patterns::BLOCK_CACHE_STATS_START.captures(line) {
            Some(caps) => caps,
            None => bail!("block cache section does not open with a cache id line: {line}"),
        };
        let cache_id = Ustr::from(&caps[1]);
        let capacity_bytes = value_by_unit(&caps[2], &caps[3])?;

        self.caches.entry(cache_id).or_insert(Cache {
            capacity_bytes,
            roles: vec![],
        });
        Ok(cache_id)
    }

    fn parse_role_stats_line(&mut self, time: Timestamp, cache_id: Ustr, line: &str) -> Result<()> {
        let blob = match patterns::BLOCK_CACHE_ENTRY_STATS.captures(line) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            // Unrecognized layout: the capacity is recorded, the samples are skipped.
            None => return Ok(()),
        };

        let roles = patterns::BLOCK_CACHE_ROLE_NAMES
            .captures_iter(blob)
            .map(|c| Ustr::from(&c[1]))
            .collect::<Vec<Ustr>>();
        let stats = patterns::BLOCK_CACHE_ROLE_STATS
            .captures_iter(blob)
            .map(|c| c.get(1).map(|m| m.as_str()).unwrap_or(""))
            .collect::<Vec<&str>>();
        if roles.len() != stats.len() {
            bail!("block cache roles line for {cache_id} has mismatched name/stats pairs");
        }

        // The entry exists: parse_cache_id_line ran first.
        let cache = match self.caches.get_mut(&cache_id) {
            Some(cache) => cache,
            None => bail!("block cache {cache_id} vanished between lines"),
        };
        for (role, stat) in roles.iter().zip(stats.iter()) {
            let caps = match patterns::BLOCK_CACHE_ROLE_COMPONENTS.captures(stat) {
                Some(caps) => caps,
                None => bail!("malformed block cache role stats for {cache_id}: {stat}"),
            };
            let sample = RoleStats {
                count: caps[1].parse::<u64>()?,
                size_bytes: value_by_unit(&caps[2], &caps[3])?,
                portion_percent: caps[4].parse::<f64>()?,
            };
            cache.push_sample(*role, time, sample);
        }
        Ok(())
    }

    /// The cache ids seen so far, sorted by name.

    pub fn cache_ids(&self) -> Vec<Ustr> {
        let mut ids = self.caches.keys().copied().collect::<Vec<Ustr>>();
        ids.sort();
        ids
    }

    pub fn cache(&self, cache_id: Ustr) -> Option<&Cache> {
        self.caches.get(&cache_id)
    }
}

#[cfg(test)]
const CACHE_ID_LINE: &str = "Block cache LRUCache@0x5600bb634770 capacity: 8.00 MB \
     collections: 1 last_copies: 0 last_secs: 0.000229 secs_since: 0";

#[cfg(test)]
fn ts(s: &str) -> Timestamp {
    crate::dates::parse_timestamp(s).unwrap()
}

#[test]
fn test_block_cache_section() {
    let mut stats = BlockCacheStats::new();
    let roles_line = "Block cache entry stats(count,size,portion): \
         DataBlock(441405,6.33 GB,27.773%) FilterBlock(3456,1.20 MB,0.1%) Misc(1,0.00 KB,0%)";
    stats
        .ingest(ts("2022/04/17-14:14:28.645150"), Ustr::from("DB_WIDE"), &[CACHE_ID_LINE, roles_line])
        .unwrap();

    let id = Ustr::from("LRUCache@0x5600bb634770");
    assert!(stats.cache_ids() == vec![id]);
    let cache = stats.cache(id).unwrap();
    assert!(cache.capacity_bytes() == 8388608);
    assert!(cache.roles().len() == 3);

    let data = cache.role_entries(Ustr::from("DataBlock"));
    assert!(data.len() == 1);
    assert!(data[0].1.count == 441405);
    assert!(data[0].1.size_bytes == value_by_unit("6.33", "GB").unwrap());
    assert!(data[0].1.portion_percent == 27.773);

    let misc = cache.role_entries(Ustr::from("Misc"));
    assert!(misc[0].1.size_bytes == 0 && misc[0].1.portion_percent == 0.0);
}

#[test]
fn test_capacity_is_first_write_wins() {
    let mut stats = BlockCacheStats::new();
    let no_cf = Ustr::from("DB_WIDE");
    let roles_line = "Block cache entry stats(count,size,portion): DataBlock(1,1.00 KB,0.1%)";
    stats.ingest(ts("2022/04/17-14:14:28.645150"), no_cf, &[CACHE_ID_LINE, roles_line]).unwrap();

    // A later dump quoting a different capacity for the same cache id.
    let other_capacity = "Block cache LRUCache@0x5600bb634770 capacity: 16.00 MB \
         collections: 1 last_copies: 0 last_secs: 0.000229 secs_since: 0";
    stats.ingest(ts("2022/04/17-14:15:28.645150"), no_cf, &[other_capacity, roles_line]).unwrap();

    let cache = stats.cache(Ustr::from("LRUCache@0x5600bb634770")).unwrap();
    assert!(cache.capacity_bytes() == 8388608);
    // Both samples were kept.
    assert!(cache.role_entries(Ustr::from("DataBlock")).len() == 2);
}

#[test]
fn test_short_section_is_skipped() {
    let mut stats = BlockCacheStats::new();
    stats.ingest(ts("2022/04/17-14:14:28.645150"), Ustr::from("DB_WIDE"), &[CACHE_ID_LINE]).unwrap();
    assert!(stats.cache_ids().is_empty());
}
