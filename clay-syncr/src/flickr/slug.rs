//! Per-day slug uniqueness for photos

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::Result;

/// Return `proposed` if no photo taken on the same calendar day uses it,
/// else the first free `proposed-1`, `proposed-2`, ...
pub async fn get_unique_slug_for_photo(
    pool: &SqlitePool,
    taken_date: NaiveDateTime,
    proposed: &str,
) -> Result<String> {
    let mut candidate = proposed.to_string();
    let mut suffix = 1;
    while slug_taken(pool, taken_date, &candidate).await? {
        candidate = format!("{}-{}", proposed, suffix);
        suffix += 1;
    }
    Ok(candidate)
}

async fn slug_taken(pool: &SqlitePool, taken_date: NaiveDateTime, slug: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM flickr_photo WHERE date(taken_date) = ? AND slug = ?)",
    )
    .bind(taken_date.date().format("%Y-%m-%d").to_string())
    .bind(slug)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flickr::models::{save_photo, tests::sample_photo};
    use chrono::NaiveDate;
    use clay_common::db::init_database;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2008, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_slug_suffixes_on_same_day() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("slug.db")).await.unwrap();

        assert_eq!(get_unique_slug_for_photo(&pool, at(3, 9), "bridge").await.unwrap(), "bridge");

        save_photo(&pool, &sample_photo(1, "bridge", at(3, 9))).await.unwrap();
        assert_eq!(get_unique_slug_for_photo(&pool, at(3, 22), "bridge").await.unwrap(), "bridge-1");

        save_photo(&pool, &sample_photo(2, "bridge-1", at(3, 22))).await.unwrap();
        assert_eq!(get_unique_slug_for_photo(&pool, at(3, 23), "bridge").await.unwrap(), "bridge-2");

        // Another day is free
        assert_eq!(get_unique_slug_for_photo(&pool, at(4, 9), "bridge").await.unwrap(), "bridge");
    }
}
