//! Shared fakes for integration tests.
//!
//! Each fake keeps its state behind a mutex so a test can change the queue
//! between polls and inspect every call the bot made.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use swarmbot::clients::{
    Backends, ChatClient, ChatMessage, PagingClient, PagingUser, TrackerClient, TrackerUser,
};
use swarmbot::models::IncidentSource;
use swarmbot::{SwarmbotError, SwarmbotResult};

pub const PRIMARY_ID: &str = "PPRIMARY";

#[derive(Default)]
pub struct FakePaging {
    incidents: Mutex<Vec<String>>,
    users: Mutex<HashMap<String, PagingUser>>,
    assigned: Mutex<Vec<(String, String)>>,
    fail_fetch: AtomicBool,
    primary_calls: AtomicUsize,
}

impl FakePaging {
    pub fn set_incidents(&self, ids: &[&str]) {
        *self.incidents.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_open_count(&self, count: usize) {
        *self.incidents.lock().unwrap() = (0..count).map(|i| format!("Q{}", i)).collect();
    }

    pub fn add_user(&self, id: &str, email: &str) {
        self.users.lock().unwrap().insert(
            email.to_string(),
            PagingUser {
                id: id.to_string(),
                email: email.to_string(),
                name: String::new(),
                summary: String::new(),
            },
        );
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    /// (incident id, assignee id)
    pub fn assigned(&self) -> Vec<(String, String)> {
        self.assigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl PagingClient for FakePaging {
    async fn primary_on_call(&self) -> SwarmbotResult<PagingUser> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SwarmbotError::backend_fetch(
                IncidentSource::PagingSystem,
                "503 Service Unavailable",
            ));
        }
        Ok(PagingUser {
            id: PRIMARY_ID.to_string(),
            email: "primary@example.com".to_string(),
            name: String::new(),
            summary: "Primary".to_string(),
        })
    }

    async fn incidents_for_user(&self, _user_id: &str) -> SwarmbotResult<Vec<String>> {
        Ok(self.incidents.lock().unwrap().clone())
    }

    async fn find_user_by_email(&self, email: &str) -> SwarmbotResult<PagingUser> {
        self.users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| SwarmbotError::user_resolution(format!("no PagerDuty user with email {}", email)))
    }

    async fn assign_incident(&self, incident_id: &str, assignee: &PagingUser) -> SwarmbotResult<()> {
        self.assigned
            .lock()
            .unwrap()
            .push((incident_id.to_string(), assignee.id.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTracker {
    issues: Mutex<Vec<String>>,
    users: Mutex<HashMap<String, TrackerUser>>,
    assigned: Mutex<Vec<(String, String)>>,
    search_calls: AtomicUsize,
}

impl FakeTracker {
    pub fn set_issues(&self, keys: &[&str]) {
        *self.issues.lock().unwrap() = keys.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_open_count(&self, count: usize) {
        *self.issues.lock().unwrap() = (0..count).map(|i| format!("OHSS-{}", i)).collect();
    }

    pub fn add_user(&self, name: &str, email: &str) {
        self.users.lock().unwrap().insert(
            email.to_string(),
            TrackerUser {
                name: name.to_string(),
                key: String::new(),
                email_address: email.to_string(),
                display_name: String::new(),
            },
        );
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// (issue key, assignee name)
    pub fn assigned(&self) -> Vec<(String, String)> {
        self.assigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackerClient for FakeTracker {
    async fn search_issues(&self, _query: &str) -> SwarmbotResult<Vec<String>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn find_user_by_username(&self, username: &str) -> SwarmbotResult<TrackerUser> {
        self.users
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .ok_or_else(|| SwarmbotError::user_resolution(format!("no Jira user {}", username)))
    }

    async fn assign_issue(&self, issue_key: &str, assignee: &TrackerUser) -> SwarmbotResult<()> {
        self.assigned
            .lock()
            .unwrap()
            .push((issue_key.to_string(), assignee.name.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeChat {
    posted: Mutex<Vec<(String, ChatMessage)>>,
    emails: Mutex<HashMap<String, String>>,
}

impl FakeChat {
    pub fn add_email(&self, user_id: &str, email: &str) {
        self.emails
            .lock()
            .unwrap()
            .insert(user_id.to_string(), email.to_string());
    }

    pub fn posted(&self) -> Vec<(String, ChatMessage)> {
        self.posted.lock().unwrap().clone()
    }

    /// Text of every post, pretext first when present
    pub fn transcript(&self) -> Vec<String> {
        self.posted()
            .into_iter()
            .map(|(_, message)| match (message.pretext, message.text) {
                (Some(pretext), Some(text)) => format!("{}\n{}", pretext, text),
                (Some(pretext), None) => pretext,
                (None, Some(text)) => text,
                (None, None) => String::new(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> SwarmbotResult<()> {
        self.posted
            .lock()
            .unwrap()
            .push((channel.to_string(), message.clone()));
        Ok(())
    }

    async fn user_email(&self, user_id: &str) -> SwarmbotResult<String> {
        self.emails
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| SwarmbotError::user_resolution(format!("no profile for {}", user_id)))
    }
}

/// All three fakes plus the `Backends` bundle pointing at them
#[derive(Default)]
pub struct FakeBackends {
    pub paging: Arc<FakePaging>,
    pub tracker: Arc<FakeTracker>,
    pub chat: Arc<FakeChat>,
}

impl FakeBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backends(&self) -> Backends {
        Backends::new(self.paging.clone(), self.tracker.clone(), self.chat.clone())
    }
}
