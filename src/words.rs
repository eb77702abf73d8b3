/*
 * src/words.rs
 * 単語データ (words.json) を読み込んで、ステージごとに引けるようにするモジュール
 */

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

/// ステージ番号 (1 以上)
pub type StageId = u32;

/// JSON のキーは `level_1`, `level_2` ... の形
const STAGE_KEY_PREFIX: &str = "level_";

/// 単語カード 1 枚分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WordRecord {
    pub word: String, // 表示する単語
    pub prog: String, // プログラミングでの意味
    pub dict: String, // 辞書的な意味
}

/// 単語データの読み込み失敗
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read word data from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("word data is not valid JSON for the expected shape")]
    Parse(#[from] serde_json::Error),
    #[error("invalid stage key {0:?} (expected level_<N> with N >= 1)")]
    InvalidStageKey(String),
    #[error("stage {0} appears more than once in the word data")]
    DuplicateStage(StageId),
    #[error("stage {0} has no words")]
    EmptyStage(StageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stage {0} does not exist in the word data")]
pub struct UnknownStageError(pub StageId);

/// ステージ番号 -> 単語リスト。起動時に一度だけ作って、あとは読むだけ
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    stages: BTreeMap<StageId, Arc<[WordRecord]>>,
}

impl WordBank {
    /// ファイルから読み込む
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let text = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            stages = bank.len(),
            "word data loaded"
        );
        Ok(bank)
    }

    /// JSON 文字列からパースする。1 つでも不正なステージがあれば全体を失敗にする
    pub fn from_json_str(text: &str) -> Result<Self, DataLoadError> {
        let RawStages(raw) = serde_json::from_str(text)?;

        let mut stages = BTreeMap::new();
        for (key, words) in raw {
            let stage = parse_stage_key(&key).ok_or(DataLoadError::InvalidStageKey(key))?;
            if words.is_empty() {
                return Err(DataLoadError::EmptyStage(stage));
            }
            if stages.insert(stage, Arc::from(words)).is_some() {
                return Err(DataLoadError::DuplicateStage(stage));
            }
        }
        Ok(Self { stages })
    }

    /// ステージの単語リスト (元の並び順のまま)
    pub fn words_for_stage(&self, stage: StageId) -> Result<Arc<[WordRecord]>, UnknownStageError> {
        self.stages
            .get(&stage)
            .cloned()
            .ok_or(UnknownStageError(stage))
    }

    /// ステージ番号の昇順で (番号, 単語数) を返す
    pub fn stages(&self) -> impl Iterator<Item = (StageId, usize)> + '_ {
        self.stages.iter().map(|(id, words)| (*id, words.len()))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// 重複キーも落とさずに、JSON に書かれた順のまま受け取る
struct RawStages(Vec<(String, Vec<WordRecord>)>);

impl<'de> Deserialize<'de> for RawStages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawStagesVisitor;

        impl<'de> Visitor<'de> for RawStagesVisitor {
            type Value = RawStages;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of level_<N> to word lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawStages, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(RawStages(entries))
            }
        }

        deserializer.deserialize_map(RawStagesVisitor)
    }
}

/// "level_3" -> Some(3)。"level_03" や "level_+3" は受け付けない
fn parse_stage_key(key: &str) -> Option<StageId> {
    let number = key.strip_prefix(STAGE_KEY_PREFIX)?;
    if number.is_empty() || number.starts_with('0') || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse::<StageId>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "level_2": [
            { "word": "scope", "prog": "where a name is visible", "dict": "range of view" }
        ],
        "level_1": [
            { "word": "argument", "prog": "value passed to a function", "dict": "a disagreement" },
            { "word": "return", "prog": "hand a value back to the caller", "dict": "to go back" }
        ]
    }"#;

    #[test]
    fn parses_stages_in_numeric_order() {
        let bank = WordBank::from_json_str(SAMPLE).unwrap();
        let stages: Vec<_> = bank.stages().collect();
        assert_eq!(stages, vec![(1, 2), (2, 1)]);

        let words = bank.words_for_stage(1).unwrap();
        assert_eq!(words[0].word, "argument");
        assert_eq!(words[1].dict, "to go back");
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let bank = WordBank::from_json_str(SAMPLE).unwrap();
        assert_eq!(bank.words_for_stage(9).unwrap_err(), UnknownStageError(9));
    }

    #[test]
    fn rejects_bad_keys() {
        for key in ["stage_1", "level_0", "level_x", "level_", "level_01", "level_+1", "level_ 1"] {
            let text = format!(r#"{{ "{key}": [ {{ "word": "w", "prog": "p", "dict": "d" }} ] }}"#);
            let err = WordBank::from_json_str(&text).unwrap_err();
            assert!(matches!(err, DataLoadError::InvalidStageKey(k) if k == key));
        }
    }

    #[test]
    fn non_canonical_keys_do_not_merge_into_one_stage() {
        let text = r#"{
            "level_1": [ { "word": "a", "prog": "p", "dict": "d" } ],
            "level_01": [ { "word": "b", "prog": "p", "dict": "d" } ]
        }"#;
        let err = WordBank::from_json_str(text).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidStageKey(k) if k == "level_01"));
    }

    #[test]
    fn repeated_key_is_not_silently_overwritten() {
        let text = r#"{
            "level_1": [ { "word": "a", "prog": "p", "dict": "d" } ],
            "level_1": [ { "word": "b", "prog": "p", "dict": "d" } ]
        }"#;
        let err = WordBank::from_json_str(text).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateStage(1)));
    }

    #[test]
    fn non_object_document_is_a_parse_error() {
        let err = WordBank::from_json_str(r#"[ "level_1" ]"#).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse(_)));
    }

    #[test]
    fn empty_stage_fails_the_load() {
        let text = r#"{
            "level_1": [ { "word": "a", "prog": "p", "dict": "d" } ],
            "level_2": []
        }"#;
        let err = WordBank::from_json_str(text).unwrap_err();
        assert!(matches!(err, DataLoadError::EmptyStage(2)));
    }

    #[test]
    fn large_stage_numbers_are_kept_apart() {
        let text = r#"{
            "level_10": [ { "word": "a", "prog": "p", "dict": "d" } ],
            "level_1": [ { "word": "b", "prog": "p", "dict": "d" } ]
        }"#;
        let bank = WordBank::from_json_str(text).unwrap();
        assert_eq!(bank.stages().collect::<Vec<_>>(), vec![(1, 1), (10, 1)]);
    }

    #[test]
    fn rejects_records_with_missing_fields() {
        let err = WordBank::from_json_str(r#"{ "level_1": [ { "word": "x" } ] }"#).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let path = Path::new("definitely/not/here/words.json");
        let err = WordBank::load(path).unwrap_err();
        match err {
            DataLoadError::Io { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bundled_sample_data_parses() {
        let text = include_str!("../data/words.json");
        let bank = WordBank::from_json_str(text).unwrap();
        assert!(!bank.is_empty());
        assert!(bank.stages().all(|(_, count)| count > 0));
    }
}
