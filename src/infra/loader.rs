use crate::types::{InfraError, InfraResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// ファイルパスからBufReaderを作成する
/// パースやデータ変換は各ドメインで行う
pub fn load_file(file_path: &Path) -> InfraResult<BufReader<File>> {
    let file =
        File::open(file_path).map_err(|e| InfraError::file_system(file_path.display().to_string(), e))?;
    let buf_reader = BufReader::new(file);
    Ok(buf_reader)
}

/// ファイル全体をUTF-8文字列として読み込む
pub fn load_text(file_path: &Path) -> InfraResult<String> {
    let mut reader = load_file(file_path)?;
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| InfraError::file_system(file_path.display().to_string(), e))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_existing_file() {
        // 存在するファイルを読み込めることを確認
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "テスト内容").unwrap();

        let result = load_text(file.path());
        assert!(result.is_ok(), "既存ファイルの読み込みに失敗");
        assert_eq!(result.unwrap(), "テスト内容");
    }

    #[test]
    fn test_load_non_existing_file() {
        // 存在しないファイルでエラーになることを確認
        let result = load_file(Path::new("non_existent_file.txt"));
        assert!(result.is_err(), "存在しないファイルでエラーにならなかった");
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_non_utf8_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0xfd]).unwrap();

        let result = load_text(file.path());
        assert!(result.is_err(), "UTF-8でないファイルでエラーにならなかった");
        assert!(!result.unwrap_err().is_not_found());
    }
}
