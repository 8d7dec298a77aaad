//! 快照数据模型

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// 扫描得到的单个文件记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// 相对根目录的真实路径，用来拼接目标路径
    pub relative: PathBuf,
    /// 用于日志显示的相对路径，统一使用 `/` 分隔
    pub relative_path: String,
    /// 绝对路径（或相对进程工作目录的完整路径）
    pub full_path: PathBuf,
    /// 内容摘要
    pub digest: String,
}

impl FileRecord {
    pub fn new(relative: impl Into<PathBuf>, full_path: PathBuf, digest: String) -> Self {
        let relative = relative.into();
        Self {
            relative_path: normalize_relative(&relative),
            relative,
            full_path,
            digest,
        }
    }

    /// 大小写不敏感的查找键
    pub fn key(&self) -> OsString {
        path_key(&self.relative)
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = &OsStr> {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part),
        _ => None,
    })
}

/// 把相对路径转换为 `/` 分隔的显示字符串（非 UTF-8 字节会被替换）
pub fn normalize_relative(path: &Path) -> String {
    normal_components(path)
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join("/")
}

/// 大小写不敏感的键
///
/// UTF-8 的路径段转成小写；非 UTF-8 的路径段保留原始字节，不做大小写折叠，
/// 所以不同的原始文件名永远不会得到相同的键。
pub fn path_key(relative: &Path) -> OsString {
    let mut key = OsString::new();
    for (i, part) in normal_components(relative).enumerate() {
        if i > 0 {
            key.push("/");
        }
        match part.to_str() {
            Some(s) => key.push(s.to_lowercase()),
            None => key.push(part),
        }
    }
    key
}

/// 一棵目录树在某一时刻的不可变快照
#[derive(Debug, Default, Clone)]
pub struct TreeSnapshot {
    records: HashMap<OsString, FileRecord>,
    /// 因大小写冲突而被覆盖的记录
    shadowed: Vec<FileRecord>,
}

impl TreeSnapshot {
    /// 从记录构建快照
    ///
    /// 键冲突时保留相对路径按字节序排在前面的记录，其余进入 `shadowed`。
    /// 结果与输入顺序无关。
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut map: HashMap<OsString, FileRecord> = HashMap::new();
        let mut shadowed = Vec::new();

        for record in records {
            match map.entry(record.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.relative < slot.get().relative {
                        shadowed.push(slot.insert(record));
                    } else {
                        shadowed.push(record);
                    }
                }
            }
        }

        shadowed.sort_by(|a, b| a.relative.cmp(&b.relative));
        Self {
            records: map,
            shadowed,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按相对路径查找（大小写不敏感）
    pub fn get(&self, relative: impl AsRef<Path>) -> Option<&FileRecord> {
        self.records.get(&path_key(relative.as_ref()))
    }

    pub fn contains(&self, relative: impl AsRef<Path>) -> bool {
        self.get(relative).is_some()
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn shadowed(&self) -> &[FileRecord] {
        &self.shadowed
    }

    /// 冲突记录以及覆盖它的记录
    pub fn collisions(&self) -> impl Iterator<Item = (&FileRecord, &FileRecord)> {
        self.shadowed
            .iter()
            .filter_map(|s| self.records.get(&s.key()).map(|kept| (kept, s)))
    }
}
