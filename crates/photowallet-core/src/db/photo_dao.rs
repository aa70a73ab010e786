//! 照片数据访问层
//!
//! 所有多步写入（新增、删除后重排、批量排序）都在单个事务中完成，
//! 读取方只会看到完整的记录和连续的顺序值。

use std::collections::HashSet;

use rusqlite::{params, Connection, Row};

use crate::models::{NewPhoto, Photo, PhotoBlob, PhotoId, StorageStats};
use crate::utils::error::{DatabaseError, DatabaseErrorKind, DbResult};

use super::connection::Database;

const SELECT_PHOTOS: &str = r#"
    SELECT id, original_name, blob, sort_order, import_date, size, mime_type, width, height
    FROM photos
"#;

/// 从数据库行映射到 Photo 结构
fn row_to_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
    let id: String = row.get("id")?;
    let blob: Vec<u8> = row.get("blob")?;
    let sort_order: i64 = row.get("sort_order")?;
    let size: i64 = row.get("size")?;

    Ok(Photo {
        id: PhotoId::from(id),
        original_name: row.get("original_name")?,
        blob: PhotoBlob::new(blob),
        order: sort_order.max(0) as u32,
        import_date: row.get("import_date")?,
        size: size.max(0) as u64,
        mime_type: row.get("mime_type")?,
        width: row.get("width")?,
        height: row.get("height")?,
    })
}

/// 按当前顺序读取所有照片
fn query_ordered(conn: &Connection) -> DbResult<Vec<Photo>> {
    let sql = format!("{} ORDER BY sort_order ASC, import_date ASC, id ASC", SELECT_PHOTOS);
    let mut stmt = conn.prepare(&sql)?;
    let photos = stmt
        .query_map([], row_to_photo)?
        .collect::<rusqlite::Result<Vec<Photo>>>()?;
    Ok(photos)
}

/// 按当前顺序读取所有照片 ID，不加载图片数据
fn query_ordered_ids(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT id FROM photos ORDER BY sort_order ASC, import_date ASC, id ASC")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

/// 按当前顺序把 sort_order 重写为 0..count-1
fn renumber(conn: &Connection) -> DbResult<usize> {
    let ids = query_ordered_ids(conn)?;

    let mut stmt = conn.prepare("UPDATE photos SET sort_order = ?1 WHERE id = ?2")?;
    for (index, id) in ids.iter().enumerate() {
        stmt.execute(params![index as i64, id])?;
    }

    Ok(ids.len())
}

impl Database {
    // ==================== Photo CRUD ====================

    /// 获取所有照片（按顺序升序）
    pub fn get_all_photos(&self) -> DbResult<Vec<Photo>> {
        let conn = self.connection()?;
        query_ordered(&conn)
    }

    /// 根据 ID 获取照片
    pub fn get_photo(&self, id: &PhotoId) -> DbResult<Option<Photo>> {
        let conn = self.connection()?;
        let sql = format!("{} WHERE id = ?1", SELECT_PHOTOS);

        let result = conn.query_row(&sql, params![id.as_str()], row_to_photo);

        match result {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// 按顺序获取所有照片 ID
    pub fn get_photo_ids(&self) -> DbResult<Vec<PhotoId>> {
        let conn = self.connection()?;
        Ok(query_ordered_ids(&conn)?.into_iter().map(PhotoId::from).collect())
    }

    /// 获取照片数量
    pub fn photo_count(&self) -> DbResult<usize> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 添加照片，追加到末尾
    pub fn add_photo(&self, photo: NewPhoto) -> DbResult<Photo> {
        let id = PhotoId::generate();
        let import_date = crate::models::photo::chrono_now();

        let order = self.transaction(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;

            conn.execute(
                r#"
                INSERT INTO photos (
                    id, original_name, blob, sort_order, import_date,
                    size, mime_type, width, height
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    id.as_str(),
                    photo.original_name,
                    photo.blob.as_bytes(),
                    count,
                    import_date,
                    photo.size as i64,
                    photo.mime_type,
                    photo.width,
                    photo.height,
                ],
            )?;

            Ok(count as u32)
        })?;

        tracing::debug!("照片已保存: {} ({}), 顺序 {}", photo.original_name, id, order);

        Ok(Photo {
            id,
            original_name: photo.original_name,
            blob: photo.blob,
            order,
            import_date,
            size: photo.size,
            mime_type: photo.mime_type,
            width: photo.width,
            height: photo.height,
        })
    }

    /// 删除照片，并把剩余照片的顺序重排为连续值
    pub fn remove_photo(&self, id: &PhotoId) -> DbResult<bool> {
        self.transaction(|conn| {
            let rows = conn.execute("DELETE FROM photos WHERE id = ?1", params![id.as_str()])?;
            if rows == 0 {
                return Ok(false);
            }

            let remaining = renumber(conn)?;
            tracing::debug!("照片 {} 已删除，剩余 {} 张", id, remaining);
            Ok(true)
        })
    }

    /// 按给定列表的位置重写所有照片的顺序
    ///
    /// 列表必须恰好覆盖存储中的全部照片且不含重复 ID，否则不写入任何数据。
    pub fn update_photo_order(&self, photos: &[Photo]) -> DbResult<()> {
        self.transaction(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
            if count as usize != photos.len() {
                return Err(DatabaseError::from_kind(DatabaseErrorKind::InvalidOrder).with_detail(
                    format!("列表包含 {} 张照片，存储中有 {} 张", photos.len(), count),
                ));
            }

            let unique: HashSet<&str> = photos.iter().map(|p| p.id.as_str()).collect();
            if unique.len() != photos.len() {
                return Err(DatabaseError::from_kind(DatabaseErrorKind::InvalidOrder)
                    .with_detail(format!("列表包含重复的照片 ID（{} 个不同 ID）", unique.len())));
            }

            let mut stmt = conn.prepare("UPDATE photos SET sort_order = ?1 WHERE id = ?2")?;
            for (index, photo) in photos.iter().enumerate() {
                let rows = stmt.execute(params![index as i64, photo.id.as_str()])?;
                if rows == 0 {
                    return Err(DatabaseError::from_kind(DatabaseErrorKind::NotFound)
                        .with_detail(format!("照片 {} 不存在", photo.id)));
                }
            }

            Ok(())
        })
    }

    /// 删除所有照片
    pub fn clear_all_photos(&self) -> DbResult<usize> {
        let conn = self.connection()?;
        let rows = conn.execute("DELETE FROM photos", [])?;
        tracing::info!("已清空照片，共删除 {} 张", rows);
        Ok(rows)
    }

    /// 获取存储统计
    pub fn storage_stats(&self) -> DbResult<StorageStats> {
        let conn = self.connection()?;
        let (count, total): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM photos",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let average_size = if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        };

        Ok(StorageStats {
            photo_count: count as usize,
            total_size: total.max(0) as u64,
            average_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_photo(name: &str) -> NewPhoto {
        NewPhoto {
            original_name: name.to_string(),
            blob: PhotoBlob::new(name.as_bytes().to_vec()),
            size: name.len() as u64,
            mime_type: "image/jpeg".to_string(),
            width: Some(1920),
            height: Some(1080),
        }
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn orders(db: &Database) -> Vec<u32> {
        db.get_all_photos().unwrap().iter().map(|p| p.order).collect()
    }

    #[test]
    fn test_add_and_get_photo() {
        let db = setup();

        let photo = db.add_photo(create_test_photo("test.jpg")).unwrap();
        assert_eq!(photo.order, 0);

        let retrieved = db.get_photo(&photo.id).unwrap();
        assert!(retrieved.is_some());

        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.original_name, "test.jpg");
        assert_eq!(retrieved.blob.as_bytes(), b"test.jpg");
        assert_eq!(retrieved.width, Some(1920));
        assert_eq!(retrieved.import_date, photo.import_date);
    }

    #[test]
    fn test_add_appends_at_end() {
        let db = setup();

        for i in 0..4 {
            let photo = db.add_photo(create_test_photo(&format!("photo_{}.jpg", i))).unwrap();
            assert_eq!(photo.order, i);
        }

        assert_eq!(orders(&db), vec![0, 1, 2, 3]);
        assert_eq!(db.photo_count().unwrap(), 4);
    }

    #[test]
    fn test_listing_is_stable() {
        let db = setup();
        for i in 0..3 {
            db.add_photo(create_test_photo(&format!("photo_{}.jpg", i))).unwrap();
        }

        let first: Vec<_> = db.get_all_photos().unwrap().iter().map(|p| p.metadata()).collect();
        let second: Vec<_> = db.get_all_photos().unwrap().iter().map(|p| p.metadata()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_remove_renumbers() {
        let db = setup();
        let ids: Vec<PhotoId> = (0..4)
            .map(|i| db.add_photo(create_test_photo(&format!("photo_{}.jpg", i))).unwrap().id)
            .collect();

        assert!(db.remove_photo(&ids[1]).unwrap());

        let photos = db.get_all_photos().unwrap();
        assert_eq!(photos.len(), 3);
        assert!(photos.iter().all(|p| p.id != ids[1]));
        assert_eq!(orders(&db), vec![0, 1, 2]);

        let remaining: Vec<&PhotoId> = photos.iter().map(|p| &p.id).collect();
        assert_eq!(remaining, vec![&ids[0], &ids[2], &ids[3]]);
    }

    #[test]
    fn test_remove_missing_photo() {
        let db = setup();
        db.add_photo(create_test_photo("a.jpg")).unwrap();

        let removed = db.remove_photo(&PhotoId::from("missing")).unwrap();
        assert!(!removed);
        assert_eq!(db.photo_count().unwrap(), 1);
    }

    #[test]
    fn test_update_photo_order() {
        let db = setup();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            db.add_photo(create_test_photo(name)).unwrap();
        }

        let mut photos = db.get_all_photos().unwrap();
        photos.reverse();
        db.update_photo_order(&photos).unwrap();

        let names: Vec<String> = db
            .get_all_photos()
            .unwrap()
            .into_iter()
            .map(|p| p.original_name)
            .collect();
        assert_eq!(names, vec!["c.jpg", "b.jpg", "a.jpg"]);
        assert_eq!(orders(&db), vec![0, 1, 2]);
    }

    #[test]
    fn test_partial_order_list_is_rejected() {
        let db = setup();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            db.add_photo(create_test_photo(name)).unwrap();
        }

        let mut photos = db.get_all_photos().unwrap();
        photos.reverse();
        photos.pop();

        let err = db.update_photo_order(&photos).unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::InvalidOrder);

        // 未写入任何修改
        let names: Vec<String> = db
            .get_all_photos()
            .unwrap()
            .into_iter()
            .map(|p| p.original_name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_duplicate_id_in_order_list_is_rejected() {
        let db = setup();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            db.add_photo(create_test_photo(name)).unwrap();
        }

        // 长度与存储一致，但第一张出现两次
        let photos = db.get_all_photos().unwrap();
        let duplicated = vec![photos[0].clone(), photos[0].clone(), photos[2].clone()];

        let err = db.update_photo_order(&duplicated).unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::InvalidOrder);

        assert_eq!(orders(&db), vec![0, 1, 2]);
        let names: Vec<String> = db
            .get_all_photos()
            .unwrap()
            .into_iter()
            .map(|p| p.original_name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_get_photo_ids_follows_order() {
        let db = setup();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            db.add_photo(create_test_photo(name)).unwrap();
        }

        let mut photos = db.get_all_photos().unwrap();
        photos.rotate_left(1);
        db.update_photo_order(&photos).unwrap();

        let expected: Vec<PhotoId> = photos.iter().map(|p| p.id.clone()).collect();
        assert_eq!(db.get_photo_ids().unwrap(), expected);
    }

    #[test]
    fn test_unknown_id_rolls_back_order_update() {
        let db = setup();
        for name in ["a.jpg", "b.jpg"] {
            db.add_photo(create_test_photo(name)).unwrap();
        }

        let mut photos = db.get_all_photos().unwrap();
        photos.swap(0, 1);
        photos[1].id = PhotoId::from("ghost");

        let err = db.update_photo_order(&photos).unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::NotFound);

        let names: Vec<String> = db
            .get_all_photos()
            .unwrap()
            .into_iter()
            .map(|p| p.original_name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_clear_all_then_add_starts_at_zero() {
        let db = setup();
        let first = db.add_photo(create_test_photo("a.jpg")).unwrap();
        db.add_photo(create_test_photo("b.jpg")).unwrap();

        assert_eq!(db.clear_all_photos().unwrap(), 2);
        assert!(db.get_all_photos().unwrap().is_empty());

        let photo = db.add_photo(create_test_photo("c.jpg")).unwrap();
        assert_eq!(photo.order, 0);
        assert_ne!(photo.id, first.id);
    }

    #[test]
    fn test_storage_stats() {
        let db = setup();
        assert_eq!(db.storage_stats().unwrap().photo_count, 0);
        assert_eq!(db.storage_stats().unwrap().average_size, 0.0);

        db.add_photo(create_test_photo("ab.jpg")).unwrap();
        db.add_photo(create_test_photo("abcd.jpg")).unwrap();

        let stats = db.storage_stats().unwrap();
        assert_eq!(stats.photo_count, 2);
        assert_eq!(stats.total_size, 14);
        assert_eq!(stats.average_size, 7.0);
    }
}
