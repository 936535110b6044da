use muster_db::models::Event;
use muster_types::api::{
    AddEventRequest, DeleteEventReply, DeleteEventRequest, EventReply, UpdateEventRequest,
};
use muster_types::time::Timestamp;

use crate::service_user::user_reply;
use crate::{Backend, ServiceError};

impl Backend {
    pub fn add_event(&self, req: AddEventRequest) -> Result<EventReply, ServiceError> {
        let _gate = self.write_gate();

        let event = Event::prepare(&req.title, &req.content, req.author_id);
        event
            .validate()
            .map_err(|e| ServiceError::internal("error while creating event in database", e))?;

        let created = self
            .db()
            .save_event(&event)
            .map_err(|e| ServiceError::internal("error while creating event in database", e))?;

        Ok(event_reply(&created))
    }

    pub fn update_event(
        &self,
        id: u64,
        req: UpdateEventRequest,
    ) -> Result<EventReply, ServiceError> {
        let _gate = self.write_gate();

        let event = Event::prepare(&req.title, &req.content, req.author_id);
        event
            .validate()
            .map_err(|e| ServiceError::internal("error while updating event in database", e))?;

        let updated = self
            .db()
            .update_event(&event, id)
            .map_err(|e| ServiceError::internal("error while updating event in database", e))?;

        Ok(event_reply(&updated))
    }

    pub fn get_event(&self, id: u64) -> Result<EventReply, ServiceError> {
        let _gate = self.read_gate();

        let event = self
            .db()
            .find_event(id)
            .map_err(|e| ServiceError::internal("unable to get event", e))?;

        Ok(event_reply(&event))
    }

    pub fn delete_event(
        &self,
        id: u64,
        req: DeleteEventRequest,
    ) -> Result<DeleteEventReply, ServiceError> {
        let _gate = self.write_gate();

        let rows_affected = self
            .db()
            .delete_event(id, req.author_id)
            .map_err(|e| ServiceError::internal("unable to delete event", e))?;

        Ok(DeleteEventReply {
            event_id: rows_affected,
            author_id: req.author_id,
        })
    }

    pub fn list_events(
        &self,
        sink: &mut dyn FnMut(EventReply) -> bool,
    ) -> Result<(), ServiceError> {
        let _gate = self.read_gate();

        self.db()
            .for_each_event(sink)
            .map_err(|e| ServiceError::internal("error while streaming events from database", e))
    }
}

fn event_reply(event: &Event) -> EventReply {
    EventReply {
        id: event.id,
        title: event.title.clone(),
        content: event.content.clone(),
        author_id: event.author_id,
        author: event.author.as_ref().map(user_reply),
        created_at: Timestamp::from(event.created_at),
        updated_at: Timestamp::from(event.updated_at),
    }
}
