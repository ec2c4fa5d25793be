use anyhow::Result;

use super::storage::Storage;
use crate::models::Conversation;

const CONVERSATIONS_KEY: &str = "conversations";

/// Capacity-bounded, most-recent-first conversation collection persisted as
/// a single JSON document. Last write wins on the underlying store;
/// concurrent multi-writer reconciliation is out of scope.
#[derive(Clone)]
pub struct ConversationStore {
    storage: Storage,
}

impl ConversationStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn load(&self) -> Result<Vec<Conversation>> {
        match self.storage.get(CONVERSATIONS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("corrupt conversations document, starting empty: {e}");
                Vec::new()
            })),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, conversations: &[Conversation]) -> Result<()> {
        let json = serde_json::to_string(conversations)?;
        self.storage.set(CONVERSATIONS_KEY, &json).await
    }

    /// Most-recently-updated-first listing.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        let mut all = self.load().await?;
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.load().await?.into_iter().find(|c| c.id == id))
    }

    /// Insert or update, re-fronting the conversation. A *new* insert that
    /// pushes the count over `max` evicts the oldest entries (by
    /// `updated_at`) down to the cap; updating an existing conversation
    /// never evicts.
    pub async fn upsert(&self, conversation: &Conversation, max: usize) -> Result<()> {
        let mut all = self.load().await?;

        match all.iter().position(|c| c.id == conversation.id) {
            Some(idx) => {
                all.remove(idx);
                all.insert(0, conversation.clone());
            }
            None => {
                all.insert(0, conversation.clone());
                if max > 0 && all.len() > max {
                    all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                    all.truncate(max);
                }
            }
        }

        self.save(&all).await
    }

    /// Returns whether the conversation existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut all = self.load().await?;
        let before = all.len();
        all.retain(|c| c.id != id);
        let found = all.len() != before;
        if found {
            self.save(&all).await?;
        }
        Ok(found)
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(CONVERSATIONS_KEY).await
    }
}

/// Derive a short conversation title from message text. Character-bounded,
/// not word-boundary-aware.
pub fn truncate_title(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.len() > 50 {
        let boundary = first_line
            .char_indices()
            .take_while(|(i, _)| *i < 47)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(47);
        format!("{}...", &first_line[..boundary])
    } else {
        first_line.to_string()
    }
}
