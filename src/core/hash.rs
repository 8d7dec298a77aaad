//! 文件内容哈希 - 用于变化检测

use crate::error::{Result, SyncError};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// 读取缓冲区大小
const BUFFER_SIZE: usize = 64 * 1024;

/// 摘要保留的字节数（16 字节 = 32 个十六进制字符），足够检测变化
const DIGEST_BYTES: usize = 16;

/// 内容哈希接口
///
/// 实现必须是确定性的，并以流的方式读取文件。
pub trait ContentHasher: Send + Sync {
    fn digest(&self, path: &Path) -> Result<String>;
}

/// 使用 BLAKE3 的哈希器
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Blake3Hasher {
    fn digest(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path).map_err(|e| SyncError::read(path, e))?;
        digest_reader(&mut file).map_err(|e| SyncError::read(path, e))
    }
}

/// 流式计算任意 reader 的摘要
pub fn digest_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize().to_hex()[..DIGEST_BYTES * 2].to_string())
}

/// 直接计算一段内存数据的摘要，和 `digest_reader` 结果一致
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex()[..DIGEST_BYTES * 2].to_string()
}
