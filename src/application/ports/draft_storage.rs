use crate::shared::error::StorageError;

/// ドラフトの永続化媒体ポート
///
/// 同一オリジン内で共有される同期的な文字列キーバリューストア。
/// 各操作は媒体レベルで単一キーに対してアトミックであること。
/// 容量超過は `set_item` から `StorageError::QuotaExceeded` として返す。
pub trait DraftStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// 現在保存されている全キー（媒体の列挙順）
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_item(key)?.is_some())
    }
}
