use crate::infra::loader::load_file;
use crate::types::{InfraError, InfraResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// JSONファイルからSerdeでDeserializeできる型を読み込む
pub fn load_json_from_file<T: DeserializeOwned>(file_path: &Path) -> InfraResult<T> {
    let buf_reader = load_file(file_path)?;
    serde_json::from_reader(buf_reader).map_err(|e| {
        InfraError::serialization(format!("JSONファイルの解析: {}", file_path.display()), e)
    })
}

/// 値を整形済みJSONとしてファイルに書き込む（既存ファイルは上書き）
pub fn save_json_to_file<T: Serialize>(file_path: &Path, value: &T) -> InfraResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        InfraError::serialization(format!("JSONの生成: {}", file_path.display()), e)
    })?;
    save_bytes_to_file(file_path, json.as_bytes())
}

/// バイト列をファイルに書き込む
///
/// 同じディレクトリの一時ファイルに書き込んでからリネームするため、
/// 書き込みが途中で失敗しても既存のファイルは元の内容のまま残る。
pub fn save_bytes_to_file(file_path: &Path, bytes: &[u8]) -> InfraResult<()> {
    let path_str = file_path.display().to_string();
    let parent = match file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .map_err(|e| InfraError::file_system(parent.display().to_string(), e))?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| InfraError::file_system(parent.display().to_string(), e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| InfraError::file_system(path_str.clone(), e))?;
    temp.persist(file_path)
        .map_err(|e| InfraError::file_system(path_str, e.error))?;
    Ok(())
}

/// ファイルが存在すれば削除する
pub fn remove_file_if_exists(file_path: &Path) -> InfraResult<()> {
    match fs::remove_file(file_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InfraError::file_system(file_path.display().to_string(), e)),
    }
}
