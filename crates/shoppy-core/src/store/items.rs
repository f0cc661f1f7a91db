//! Ordered items of a list.
//!
//! Membership is not checked here; callers gate through access control.

use std::sync::Arc;

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    domain::{ItemId, ListId, UserId},
    models::Item,
    ports::Clock,
    Error, Result,
};

const ITEM_COLUMNS: &str =
    "id, list_id, name, is_checked, is_hidden, added_by, added_at, order_index";

#[derive(Clone)]
pub struct ItemStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ItemStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Append to the end of the list (`max(order_index) + 1`).
    pub async fn add(&self, list_id: ListId, added_by: UserId, name: &str) -> Result<Item> {
        let res = sqlx::query(
            "INSERT INTO items (list_id, name, is_checked, is_hidden, added_by, added_at, order_index) \
             SELECT ?, ?, 0, 0, ?, ?, COALESCE(MAX(order_index), 0) + 1 \
             FROM items WHERE list_id = ?",
        )
        .bind(list_id.0)
        .bind(name)
        .bind(added_by.0)
        .bind(self.clock.now())
        .bind(list_id.0)
        .execute(&self.pool)
        .await?;

        let id = ItemId(res.last_insert_rowid());
        self.get(id)
            .await?
            .ok_or_else(|| Error::CorruptRow(format!("item {} vanished after insert", id.0)))
    }

    pub async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    /// Items in display order; hidden ones only when asked for.
    pub async fn items(&self, list_id: ListId, include_hidden: bool) -> Result<Vec<Item>> {
        let sql = if include_hidden {
            format!("SELECT {ITEM_COLUMNS} FROM items WHERE list_id = ? ORDER BY order_index, id")
        } else {
            format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE list_id = ? AND is_hidden = 0 \
                 ORDER BY order_index, id"
            )
        };
        let rows = sqlx::query(&sql)
            .bind(list_id.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    /// 1-based position within the filtered, ordered view.
    pub async fn get_by_position(
        &self,
        list_id: ListId,
        position: usize,
        include_hidden: bool,
    ) -> Result<Option<Item>> {
        if position == 0 {
            return Ok(None);
        }
        let mut items = self.items(list_id, include_hidden).await?;
        if position > items.len() {
            return Ok(None);
        }
        Ok(Some(items.swap_remove(position - 1)))
    }

    pub async fn check(&self, id: ItemId) -> Result<bool> {
        self.set_flag(id, "is_checked", true).await
    }

    pub async fn uncheck(&self, id: ItemId) -> Result<bool> {
        self.set_flag(id, "is_checked", false).await
    }

    pub async fn hide(&self, id: ItemId) -> Result<bool> {
        self.set_flag(id, "is_hidden", true).await
    }

    pub async fn show(&self, id: ItemId) -> Result<bool> {
        self.set_flag(id, "is_hidden", false).await
    }

    pub async fn delete(&self, id: ItemId) -> Result<bool> {
        let res = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Move an item to a 1-based position and renumber the whole list `1..=n`.
    ///
    /// Positions below 1 land first, positions past the end land last.
    pub async fn reorder(&self, id: ItemId, new_position: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query("SELECT list_id FROM items WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(false);
        };
        let list_id: i64 = row.try_get("list_id")?;

        let rows = sqlx::query("SELECT id FROM items WHERE list_id = ? ORDER BY order_index, id")
            .bind(list_id)
            .fetch_all(&mut *tx)
            .await?;
        let mut order = rows
            .iter()
            .map(|r| r.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        order.retain(|&other| other != id.0);
        let slot = new_position.saturating_sub(1).clamp(0, order.len() as i64) as usize;
        order.insert(slot, id.0);

        for (idx, item_id) in order.iter().enumerate() {
            sqlx::query("UPDATE items SET order_index = ? WHERE id = ?")
                .bind(idx as i64 + 1)
                .bind(*item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn set_flag(&self, id: ItemId, column: &'static str, value: bool) -> Result<bool> {
        let res = sqlx::query(&format!("UPDATE items SET {column} = ? WHERE id = ?"))
            .bind(value)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    Ok(Item {
        id: ItemId(row.try_get("id")?),
        list_id: ListId(row.try_get("list_id")?),
        name: row.try_get("name")?,
        is_checked: row.try_get("is_checked")?,
        is_hidden: row.try_get("is_hidden")?,
        added_by: UserId(row.try_get("added_by")?),
        added_at: row.try_get("added_at")?,
        order_index: row.try_get("order_index")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::User, store::testing::fixture};

    struct Setup {
        fx: crate::store::testing::Fixture,
        owner: User,
        list: ListId,
    }

    async fn setup() -> Setup {
        let fx = fixture().await;
        let owner = fx.user(1, "Ann").await;
        let list = fx.stores.lists.create(owner.id, "Groceries").await.unwrap().id;
        Setup { fx, owner, list }
    }

    impl Setup {
        async fn add_all(&self, names: &[&str]) -> Vec<Item> {
            let mut out = Vec::new();
            for n in names {
                out.push(
                    self.fx
                        .stores
                        .items
                        .add(self.list, self.owner.id, n)
                        .await
                        .unwrap(),
                );
            }
            out
        }

        async fn names(&self) -> Vec<(String, i64)> {
            self.fx
                .stores
                .items
                .items(self.list, true)
                .await
                .unwrap()
                .into_iter()
                .map(|i| (i.name, i.order_index))
                .collect()
        }
    }

    #[tokio::test]
    async fn add_appends_dense_indices_in_insertion_order() {
        let s = setup().await;
        let added = s.add_all(&["Milk", "Eggs", "Bread", "Butter"]).await;
        assert_eq!(added[0].order_index, 1);
        assert!(!added[0].is_checked && !added[0].is_hidden);
        assert_eq!(added[0].added_by, s.owner.id);

        assert_eq!(
            s.names().await,
            vec![
                ("Milk".to_string(), 1),
                ("Eggs".to_string(), 2),
                ("Bread".to_string(), 3),
                ("Butter".to_string(), 4),
            ]
        );
    }

    #[tokio::test]
    async fn indices_are_scoped_per_list() {
        let s = setup().await;
        s.add_all(&["Milk", "Eggs"]).await;
        let other = s
            .fx
            .stores
            .lists
            .create(s.owner.id, "Hardware")
            .await
            .unwrap();
        let nails = s
            .fx
            .stores
            .items
            .add(other.id, s.owner.id, "Nails")
            .await
            .unwrap();
        assert_eq!(nails.order_index, 1);
    }

    #[tokio::test]
    async fn hidden_items_only_in_full_view() {
        let s = setup().await;
        let items = s.add_all(&["Milk", "Eggs", "Bread"]).await;
        let store = &s.fx.stores.items;

        assert!(store.hide(items[1].id).await.unwrap());

        let visible = store.items(s.list, false).await.unwrap();
        assert_eq!(
            visible.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["Milk", "Bread"]
        );
        let all = store.items(s.list, true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[1].is_hidden);

        assert!(store.show(items[1].id).await.unwrap());
        assert_eq!(store.items(s.list, false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn position_lookup_uses_the_filtered_view() {
        let s = setup().await;
        let items = s.add_all(&["Milk", "Eggs", "Bread"]).await;
        let store = &s.fx.stores.items;
        store.hide(items[0].id).await.unwrap();

        let first_visible = store.get_by_position(s.list, 1, false).await.unwrap().unwrap();
        assert_eq!(first_visible.name, "Eggs");
        let first_any = store.get_by_position(s.list, 1, true).await.unwrap().unwrap();
        assert_eq!(first_any.name, "Milk");

        assert_eq!(store.get_by_position(s.list, 0, false).await.unwrap(), None);
        assert_eq!(store.get_by_position(s.list, 3, false).await.unwrap(), None);
        assert!(store.get_by_position(s.list, 3, true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn flag_mutations_report_missing_items() {
        let s = setup().await;
        let items = s.add_all(&["Milk"]).await;
        let store = &s.fx.stores.items;

        assert!(store.check(items[0].id).await.unwrap());
        assert!(store.get(items[0].id).await.unwrap().unwrap().is_checked);
        assert!(store.uncheck(items[0].id).await.unwrap());
        assert!(!store.get(items[0].id).await.unwrap().unwrap().is_checked);

        let missing = ItemId(999);
        assert!(!store.check(missing).await.unwrap());
        assert!(!store.uncheck(missing).await.unwrap());
        assert!(!store.hide(missing).await.unwrap());
        assert!(!store.show(missing).await.unwrap());
        assert!(!store.delete(missing).await.unwrap());
        assert!(!store.reorder(missing, 1).await.unwrap());
        assert_eq!(store.get(missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_the_item() {
        let s = setup().await;
        let items = s.add_all(&["Milk", "Eggs"]).await;
        assert!(s.fx.stores.items.delete(items[0].id).await.unwrap());
        assert_eq!(s.names().await, vec![("Eggs".to_string(), 2)]);
    }

    #[tokio::test]
    async fn reorder_moves_to_front() {
        let s = setup().await;
        let items = s.add_all(&["Item 1", "Item 2", "Item 3"]).await;

        assert!(s.fx.stores.items.reorder(items[2].id, 1).await.unwrap());
        assert_eq!(
            s.names().await,
            vec![
                ("Item 3".to_string(), 1),
                ("Item 1".to_string(), 2),
                ("Item 2".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn reorder_clamps_and_densifies_after_gaps() {
        let s = setup().await;
        let items = s.add_all(&["A", "B", "C", "D"]).await;
        let store = &s.fx.stores.items;
        store.delete(items[1].id).await.unwrap();

        assert!(store.reorder(items[0].id, 99).await.unwrap());
        assert_eq!(
            s.names().await,
            vec![
                ("C".to_string(), 1),
                ("D".to_string(), 2),
                ("A".to_string(), 3),
            ]
        );

        assert!(store.reorder(items[0].id, -5).await.unwrap());
        assert_eq!(
            s.names().await,
            vec![
                ("A".to_string(), 1),
                ("C".to_string(), 2),
                ("D".to_string(), 3),
            ]
        );

        assert!(store.reorder(items[3].id, 2).await.unwrap());
        assert_eq!(
            s.names().await,
            vec![
                ("A".to_string(), 1),
                ("D".to_string(), 2),
                ("C".to_string(), 3),
            ]
        );

        assert!(store.reorder(items[0].id, i64::MAX).await.unwrap());
        assert!(store.reorder(items[2].id, i64::MIN).await.unwrap());
        assert_eq!(
            s.names().await,
            vec![
                ("C".to_string(), 1),
                ("D".to_string(), 2),
                ("A".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn add_after_reorder_continues_from_max() {
        let s = setup().await;
        let items = s.add_all(&["A", "B"]).await;
        s.fx.stores.items.reorder(items[1].id, 1).await.unwrap();
        let c = s.fx.stores.items.add(s.list, s.owner.id, "C").await.unwrap();
        assert_eq!(c.order_index, 3);
    }
}
