use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 文字列からSHA256ベースのハッシュ値を計算する
///
/// # Arguments
/// * `input` - ハッシュ計算対象の文字列
/// * `length` - 出力するハッシュの長さ（最大64文字）
///
/// # Returns
/// 指定された長さに制限されたSHA256ハッシュ文字列（16進数）
pub fn calc_hash(input: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hash_bytes = hasher.finalize();
    let hash_hex = format!("{:x}", hash_bytes);

    // SHA256は64文字の16進数文字列を生成するため、指定された長さでトリミング
    let max_length = length.min(hash_hex.len());
    hash_hex[..max_length].to_string()
}

/// OAuth署名用のnonceを生成する
///
/// 現在時刻・プロセス内カウンタ・呼び出し側の文字列を混ぜてハッシュ化するため、
/// 同じ秒に同じIDで連続して呼んでも値が重複しない。
///
/// # Returns
/// 32文字の16進数文字列
pub fn generate_nonce(salt: &str) -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let counter = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    calc_hash(&format!("{}:{}:{}", nanos, counter, salt), 32)
}
