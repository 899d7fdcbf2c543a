use wouldyou_types::models::pair_key;

/// A built-in option pair. The daily rotation draws from these, and they seed
/// a category's non-daily challenges the first time it is browsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolEntry {
    pub option_a: &'static str,
    pub option_b: &'static str,
    pub category: &'static str,
}

impl PoolEntry {
    pub fn pair_key(&self) -> String {
        pair_key(self.option_a, self.option_b)
    }
}

const fn entry(option_a: &'static str, option_b: &'static str, category: &'static str) -> PoolEntry {
    PoolEntry {
        option_a,
        option_b,
        category,
    }
}

pub const DAILY_POOL: &[PoolEntry] = &[
    entry("Have unlimited money but no friends", "Have amazing friends but always be broke", "life"),
    entry("Know when you'll die", "Know how you'll die", "deep"),
    entry("Be able to fly", "Be able to read minds", "superpower"),
    entry("Live in the past", "Live in the future", "time"),
    entry("Never use social media again", "Never watch movies/TV again", "tech"),
    entry("Have free WiFi everywhere", "Have free coffee everywhere", "daily"),
    entry("Be famous but hated", "Be unknown but loved", "fame"),
    entry("Always be cold", "Always be hot", "comfort"),
    entry("Have a rewind button for life", "Have a pause button for life", "power"),
    entry("Speak every language", "Play every instrument", "skill"),
];

/// Categories offered when the store has none, and kept topped up at startup.
pub const DEFAULT_CATEGORIES: &[&str] = &["life", "deep", "superpower", "funny", "love", "tech"];

pub fn entries_in(category: &str) -> impl Iterator<Item = &'static PoolEntry> + '_ {
    DAILY_POOL.iter().filter(move |e| e.category == category)
}
