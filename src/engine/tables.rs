//! Read-only lookup tables loaded once at startup: monster names by strength and
//! flavor text for godsends and calamities.

use rand::Rng;
use std::collections::HashMap;
use std::path::Path;

use crate::engine::errors::GameError;

pub const GODSEND_GENERIC: &str = "godsend-generic";
pub const CALAMITY_GENERIC: &str = "calamity-generic";

/// Name used when no table entry is strong enough for a monster.
pub const DEFAULT_MONSTER_NAME: &str = "Monster";

/// Ascending `(threshold, name)` pairs.
#[derive(Debug, Clone, Default)]
pub struct MonsterTable {
    entries: Vec<(i64, String)>,
}

impl MonsterTable {
    /// Parse `<threshold> <name>` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, GameError> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (threshold, name) = line.split_once(char::is_whitespace).ok_or_else(|| {
                GameError::DataCorruption(format!("monster table line {}: {:?}", lineno + 1, line))
            })?;
            let threshold = threshold.parse::<i64>().map_err(|_| {
                GameError::DataCorruption(format!(
                    "monster table line {}: bad threshold {:?}",
                    lineno + 1,
                    threshold
                ))
            })?;
            entries.push((threshold, name.trim().to_string()));
        }
        entries.sort_by_key(|(threshold, _)| *threshold);
        Ok(Self { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// First monster whose threshold is at least `target_sum`.
    pub fn name_for(&self, target_sum: i64) -> &str {
        self.entries
            .iter()
            .find(|(threshold, _)| *threshold >= target_sum)
            .map(|(_, name)| name.as_str())
            .unwrap_or(DEFAULT_MONSTER_NAME)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flavor lines partitioned by category.
#[derive(Debug, Clone, Default)]
pub struct FlavorTable {
    lines: HashMap<String, Vec<String>>,
}

impl FlavorTable {
    /// Parse `<code> <text>` lines. `G` lines are godsend flavor, `C` lines calamity
    /// flavor; any other code becomes its own lowercase category.
    pub fn parse(text: &str) -> Self {
        let mut lines: HashMap<String, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((code, flavor)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let category = match code {
                "G" => GODSEND_GENERIC.to_string(),
                "C" => CALAMITY_GENERIC.to_string(),
                other => other.to_ascii_lowercase(),
            };
            lines
                .entry(category)
                .or_default()
                .push(flavor.trim().to_string());
        }
        Self { lines }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn count(&self, category: &str) -> usize {
        self.lines.get(category).map_or(0, Vec::len)
    }

    /// Pick one line of `category` uniformly by reservoir sampling: the n-th
    /// candidate replaces the current choice with probability 1/n.
    pub fn select<R: Rng>(&self, category: &str, rng: &mut R) -> Option<&str> {
        let mut chosen = None;
        for (seen, line) in self.lines.get(category)?.iter().enumerate() {
            if rng.gen_range(0..seen + 1) == 0 {
                chosen = Some(line.as_str());
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn monster_lookup_picks_first_threshold_at_or_above() {
        let table = MonsterTable::parse("300 Troll\n100 Goblin\n\n# comment\n200 Orc Chieftain\n")
            .expect("parse");
        assert_eq!(table.len(), 3);
        assert_eq!(table.name_for(50), "Goblin");
        assert_eq!(table.name_for(100), "Goblin");
        assert_eq!(table.name_for(101), "Orc Chieftain");
        assert_eq!(table.name_for(300), "Troll");
        assert_eq!(table.name_for(301), DEFAULT_MONSTER_NAME);
        assert_eq!(MonsterTable::default().name_for(1), DEFAULT_MONSTER_NAME);
    }

    #[test]
    fn monster_table_rejects_bad_threshold() {
        assert!(matches!(
            MonsterTable::parse("lots Dragon"),
            Err(GameError::DataCorruption(_))
        ));
    }

    #[test]
    fn flavor_is_partitioned_by_code() {
        let table = FlavorTable::parse("G found a four-leaf clover\nC tripped\nG was blessed\nX other\n");
        assert_eq!(table.count(GODSEND_GENERIC), 2);
        assert_eq!(table.count(CALAMITY_GENERIC), 1);
        assert_eq!(table.count("x"), 1);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(table.select(CALAMITY_GENERIC, &mut rng), Some("tripped"));
        assert_eq!(table.select("missing", &mut rng), None);
    }

    #[test]
    fn reservoir_selection_is_roughly_uniform() {
        let table = FlavorTable::parse("G one\nG two\nG three\nG four\n");
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..40_000 {
            let line = table.select(GODSEND_GENERIC, &mut rng).expect("line");
            *counts.entry(line).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        for (line, count) in counts {
            assert!((9_000..11_000).contains(&count), "{} chosen {} times", line, count);
        }
    }
}
