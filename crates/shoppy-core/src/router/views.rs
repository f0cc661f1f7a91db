//! Data loading for screens. Rendering itself lives in `crate::screens`.

use crate::{
    domain::ItemId,
    models::{Role, ShoppingList, User},
    screens::{self, page_of, Screen},
    Result,
};

use super::Router;

impl Router {
    pub(super) async fn lists_screen(&self, user: &User, page: usize) -> Result<Screen> {
        let lists = self.stores.lists.lists_for_user(user.id).await?;
        Ok(screens::lists_overview(&lists, page, self.settings.page_size))
    }

    pub(super) async fn items_screen(&self, list: &ShoppingList, page: usize) -> Result<Screen> {
        let visible = self.stores.items.items(list.id, false).await?;
        Ok(screens::items_view(list, &visible, page, self.settings.page_size))
    }

    /// Items view on the page that shows `item`.
    pub(super) async fn items_screen_at(&self, list: &ShoppingList, item: ItemId) -> Result<Screen> {
        let visible = self.stores.items.items(list.id, false).await?;
        let page = visible
            .iter()
            .position(|i| i.id == item)
            .map(|pos| page_of(pos, self.settings.page_size))
            .unwrap_or(0);
        Ok(screens::items_view(list, &visible, page, self.settings.page_size))
    }

    pub(super) async fn visibility_screen(&self, list: &ShoppingList, page: usize) -> Result<Screen> {
        let all = self.stores.items.items(list.id, true).await?;
        Ok(screens::visibility(list, &all, page, self.settings.page_size))
    }

    pub(super) async fn visibility_screen_at(
        &self,
        list: &ShoppingList,
        item: ItemId,
    ) -> Result<Screen> {
        let all = self.stores.items.items(list.id, true).await?;
        let page = all
            .iter()
            .position(|i| i.id == item)
            .map(|pos| page_of(pos, self.settings.page_size))
            .unwrap_or(0);
        Ok(screens::visibility(list, &all, page, self.settings.page_size))
    }

    pub(super) async fn manage_list_screen(&self, list: &ShoppingList, user: &User) -> Result<Screen> {
        // A membership that vanished mid-flight renders as the weakest role.
        let role = self
            .stores
            .access
            .role(list.id, user.id)
            .await?
            .unwrap_or(Role::Member);
        Ok(screens::manage_list(list, role, user.id))
    }

    pub(super) async fn members_screen(
        &self,
        list: &ShoppingList,
        viewer: &User,
        page: usize,
    ) -> Result<Screen> {
        let members = self.stores.lists.members(list.id).await?;
        let is_admin = self.stores.access.is_admin(list.id, viewer.id).await?;
        Ok(screens::members(
            list,
            &members,
            viewer.id,
            is_admin,
            page,
            self.settings.page_size,
        ))
    }
}
