//! CRUD access to backend resources through the fallback cascade.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::error::{ClientError, ClientResult};
use crate::models::Category;
use crate::search::mapping::extract_records;
use crate::transport::{RequestSpec, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Notes,
    Tasks,
    Reminders,
    CalendarEvents,
    Chats,
    Documents,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Notes,
        Resource::Tasks,
        Resource::Reminders,
        Resource::CalendarEvents,
        Resource::Chats,
        Resource::Documents,
    ];

    pub fn base_path(&self) -> &'static str {
        match self {
            Resource::Notes => "/api/notes",
            Resource::Tasks => "/api/tasks",
            Resource::Reminders => "/api/reminders",
            Resource::CalendarEvents => "/api/calendar/events",
            Resource::Chats => "/api/chat/conversations",
            Resource::Documents => "/api/upload",
        }
    }

    /// Search category whose offline cache this resource feeds.
    pub fn search_category(&self) -> Option<Category> {
        match self {
            Resource::Notes => Some(Category::Notes),
            Resource::Tasks => Some(Category::Tasks),
            Resource::Reminders => Some(Category::Reminders),
            Resource::Chats => Some(Category::Chats),
            Resource::Documents => Some(Category::Documents),
            Resource::CalendarEvents => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Notes => "notes",
            Resource::Tasks => "tasks",
            Resource::Reminders => "reminders",
            Resource::CalendarEvents => "events",
            Resource::Chats => "chats",
            Resource::Documents => "documents",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "calendar" | "calendar-events" => return Ok(Resource::CalendarEvents),
            "chat" => return Ok(Resource::Chats),
            _ => {}
        }
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == lower)
            .ok_or_else(|| format!("unknown resource '{}'", s))
    }
}

pub struct ResourceClient {
    dispatcher: Arc<Dispatcher>,
    resource: Resource,
}

impl ResourceClient {
    pub fn new(dispatcher: Arc<Dispatcher>, resource: Resource) -> Self {
        Self {
            dispatcher,
            resource,
        }
    }

    fn item_path(&self, id: &str) -> ClientResult<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ClientError::InvalidRequest(format!(
                "invalid {} id: '{}'",
                self.resource, id
            )));
        }
        Ok(format!("{}/{}", self.resource.base_path(), id))
    }

    /// All records of this resource.
    pub async fn list(&self) -> ClientResult<Vec<Value>> {
        let resp = self
            .dispatcher
            .smart_request(&RequestSpec::get(self.resource.base_path()))
            .await?;
        let keys = ["results", "data", "items", "events", self.resource.name()];
        extract_records(&resp.body, &keys, &format!("{} list response", self.resource))
    }

    pub async fn get(&self, id: &str) -> ClientResult<Value> {
        let path = self.item_path(id)?;
        Ok(self.dispatcher.smart_request(&RequestSpec::get(path)).await?.body)
    }

    pub async fn create(&self, body: Value) -> ClientResult<Response> {
        self.dispatcher
            .smart_request(&RequestSpec::post(self.resource.base_path(), body))
            .await
    }

    pub async fn update(&self, id: &str, body: Value) -> ClientResult<Response> {
        let path = self.item_path(id)?;
        self.dispatcher.smart_request(&RequestSpec::put(path, body)).await
    }

    pub async fn patch(&self, id: &str, body: Value) -> ClientResult<Response> {
        let path = self.item_path(id)?;
        self.dispatcher.smart_request(&RequestSpec::patch(path, body)).await
    }

    pub async fn remove(&self, id: &str) -> ClientResult<Response> {
        let path = self.item_path(id)?;
        self.dispatcher.smart_request(&RequestSpec::delete(path)).await
    }
}
