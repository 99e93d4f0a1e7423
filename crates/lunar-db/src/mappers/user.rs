//! User model -> entity mapper

use lunar_core::entities::User;

use crate::models::UserModel;

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: model.id,
            username: model.username,
            avatar_url: model.avatar_url,
        }
    }
}
