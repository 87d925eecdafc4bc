//! # オブジェクトキー導出
//!
//! `<prefix>/<filename>` 形式のキーを生成する。
//! ファイル名がプレフィックス外を指すことは許さない。

use crate::error::GatewayError;

/// 不正なファイル名に対するメッセージ
pub const INVALID_FILENAME_MESSAGE: &str = "Invalid filename";

/// ファイル名がプレフィックス配下に収まるか検査する。
///
/// 拒否するもの:
/// - `..` セグメント（`../x`, `a/../../x` 等）
/// - 先頭の `/`
/// - バックスラッシュ
/// - 制御文字
///
/// `a/b.jpg` のようなサブフォルダは許可する。
pub fn validate_filename(filename: &str) -> Result<(), GatewayError> {
    let escapes = filename.starts_with('/')
        || filename.contains('\\')
        || filename.chars().any(char::is_control)
        || filename.split('/').any(|segment| segment == "..");

    if escapes {
        return Err(GatewayError::BadRequest(INVALID_FILENAME_MESSAGE.to_string()));
    }
    Ok(())
}

/// プレフィックスとファイル名からオブジェクトキーを導出する。
pub fn derive_object_key(prefix: &str, filename: &str) -> Result<String, GatewayError> {
    validate_filename(filename)?;
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        return Ok(filename.to_string());
    }
    Ok(format!("{prefix}/{filename}"))
}
