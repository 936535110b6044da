use muster_db::models::{User, ValidationMode};
use muster_types::api::{AddUserRequest, DeleteUserReply, UpdateUserRequest, UserReply};
use muster_types::time::Timestamp;

use crate::{Backend, ServiceError};

impl Backend {
    pub fn add_user(&self, req: AddUserRequest) -> Result<UserReply, ServiceError> {
        let _gate = self.write_gate();

        let user = User::prepare(&req.nickname, &req.email, &req.password);
        user.validate(ValidationMode::Create)
            .map_err(|e| ServiceError::internal("error while creating user in database", e))?;

        let created = self
            .db()
            .save_user(&user)
            .map_err(|e| ServiceError::internal("error while creating user in database", e))?;

        Ok(user_reply(&created))
    }

    pub fn update_user(&self, id: u32, req: UpdateUserRequest) -> Result<UserReply, ServiceError> {
        let _gate = self.write_gate();

        let user = User::prepare(&req.nickname, &req.email, &req.password);
        user.validate(ValidationMode::Update)
            .map_err(|e| ServiceError::internal("error while updating user in database", e))?;

        let updated = self
            .db()
            .update_user(&user, id)
            .map_err(|e| ServiceError::internal("error while updating user in database", e))?;

        Ok(user_reply(&updated))
    }

    pub fn get_user(&self, id: u32) -> Result<UserReply, ServiceError> {
        let _gate = self.read_gate();

        let user = self
            .db()
            .find_user(id)
            .map_err(|e| ServiceError::internal("unable to get user", e))?;

        Ok(user_reply(&user))
    }

    pub fn delete_user(&self, id: u32) -> Result<DeleteUserReply, ServiceError> {
        let _gate = self.write_gate();

        let rows_affected = self
            .db()
            .delete_user(id)
            .map_err(|e| ServiceError::internal("unable to delete user", e))?;

        Ok(DeleteUserReply {
            user_id: rows_affected,
        })
    }

    /// Streams every user to `sink`, holding the shared gate for the full
    /// iteration: a write started after the list acquired its gate cannot
    /// be observed mid-stream.
    pub fn list_users(
        &self,
        sink: &mut dyn FnMut(UserReply) -> bool,
    ) -> Result<(), ServiceError> {
        let _gate = self.read_gate();

        self.db()
            .for_each_user(sink)
            .map_err(|e| ServiceError::internal("error while streaming users from database", e))
    }
}

pub(crate) fn user_reply(user: &User) -> UserReply {
    UserReply {
        id: user.id,
        nickname: user.nickname.clone(),
        email: user.email.clone(),
        created_at: Timestamp::from(user.created_at),
        updated_at: Timestamp::from(user.updated_at),
    }
}
