use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use super::words::WordCounts;

/// Outcome of one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    /// Most popular words first
    #[serde(serialize_with = "ranked_map", deserialize_with = "ranked_pairs")]
    pub word_counts: WordCounts,
    pub urls_visited: usize,
}

fn ranked_map<S: Serializer>(counts: &WordCounts, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for (word, count) in counts {
        map.serialize_entry(word, count)?;
    }
    map.end()
}

fn ranked_pairs<'de, D>(deserializer: D) -> Result<WordCounts, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct RankedVisitor;

    impl<'de> serde::de::Visitor<'de> for RankedVisitor {
        type Value = WordCounts;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of word counts")
        }

        fn visit_map<A: serde::de::MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut counts = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry::<String, u64>()? {
                counts.push(entry);
            }
            Ok(counts)
        }
    }

    deserializer.deserialize_map(RankedVisitor)
}

/// Writes `result` as pretty JSON to `path`, or to stdout if there is no path
pub fn write_result(result: &CrawlResult, path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_json(result, file)
        }
        None => write_json(result, std::io::stdout().lock()),
    }
}

pub fn write_json<W: Write>(result: &CrawlResult, mut writer: W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, result)?;
    writeln!(writer)?;
    writer.flush()
}
