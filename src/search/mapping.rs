//! Per-category projections from source JSON into [`ResultItem`].
//!
//! Backends are not consistent about field names (`title` vs `name`,
//! `_id` vs `id`, camelCase vs snake_case dates), so each mapper accepts the
//! known aliases in priority order.

use serde_json::{json, Value};

use super::snippet::{contains_case_insensitive, generate_snippet};
use crate::error::{ClientError, ClientResult};
use crate::models::{Category, ResultItem};

/// Pull the record list out of a response body.
///
/// Accepts a bare array or an object wrapping one under `results`, `data`,
/// `items`, or the category name. `null` is an empty list.
pub fn extract_list(body: &Value, category: Category) -> ClientResult<Vec<Value>> {
    let what = format!("{} search response", category);
    extract_records(body, &["results", "data", "items", category.as_str()], &what)
}

/// Record list of a response that is either a bare array or an object
/// holding the array under one of `keys`. `what` names the response in
/// decode errors.
pub fn extract_records(body: &Value, keys: &[&str], what: &str) -> ClientResult<Vec<Value>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        Value::Object(obj) => keys
            .iter()
            .find_map(|key| match obj.get(*key) {
                Some(Value::Array(items)) => Some(items.clone()),
                _ => None,
            })
            .ok_or_else(|| ClientError::Decode(format!("{} has no result list", what))),
        _ => Err(ClientError::Decode(format!("{} is not a list", what))),
    }
}

/// Map every record, dropping ones without an id.
pub fn map_records(category: Category, records: &[Value], query: &str) -> Vec<ResultItem> {
    records
        .iter()
        .filter_map(|r| map_record(category, r, query))
        .collect()
}

/// Map and keep only records whose title or content contains `query`.
pub fn map_matching(category: Category, records: &[Value], query: &str) -> Vec<ResultItem> {
    map_records(category, records, query)
        .into_iter()
        .filter(|item| {
            contains_case_insensitive(&item.title, query)
                || contains_case_insensitive(&item.content, query)
        })
        .collect()
}

pub fn map_record(category: Category, record: &Value, query: &str) -> Option<ResultItem> {
    let mapped = match category {
        Category::Chats => map_chat(record),
        Category::Notes => map_note(record),
        Category::Tasks => map_task(record),
        Category::Documents => map_document(record),
        Category::Reminders => map_reminder(record),
        Category::Dictionary => map_dictionary_entry(record),
    }?;

    let snippet_source = if mapped.content.is_empty() {
        &mapped.title
    } else {
        &mapped.content
    };
    let snippet = generate_snippet(snippet_source, query);

    Some(ResultItem {
        id: mapped.id,
        kind: category.item_type().to_string(),
        title: mapped.title,
        content: mapped.content,
        snippet,
        date: mapped.date,
        url: mapped.url,
        metadata: mapped.metadata,
    })
}

struct Mapped {
    id: String,
    title: String,
    content: String,
    date: Option<String>,
    url: Option<String>,
    metadata: Value,
}

fn id_of(record: &Value) -> Option<String> {
    ["id", "_id", "uuid"]
        .iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn first_str(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn map_chat(r: &Value) -> Option<Mapped> {
    let id = id_of(r)?;
    let content = match r.get("messages").and_then(Value::as_array) {
        Some(messages) => messages
            .iter()
            .filter_map(|m| first_str(m, &["content", "text"]))
            .collect::<Vec<_>>()
            .join("\n"),
        None => first_str(r, &["lastMessage", "content", "preview"]).unwrap_or_default(),
    };
    let message_count = r
        .get("messages")
        .and_then(Value::as_array)
        .map(|m| m.len())
        .unwrap_or(0);
    Some(Mapped {
        title: first_str(r, &["title", "name"]).unwrap_or_else(|| "Untitled chat".into()),
        content,
        date: first_str(r, &["updatedAt", "updated_at", "createdAt", "created_at"]),
        url: Some(format!("/chat/{}", id)),
        metadata: json!({ "messageCount": message_count }),
        id,
    })
}

fn map_note(r: &Value) -> Option<Mapped> {
    let id = id_of(r)?;
    Some(Mapped {
        title: first_str(r, &["title", "name"]).unwrap_or_else(|| "Untitled note".into()),
        content: first_str(r, &["content", "body", "text"]).unwrap_or_default(),
        date: first_str(r, &["updatedAt", "updated_at", "createdAt", "created_at"]),
        url: Some(format!("/notes/{}", id)),
        metadata: json!({
            "tags": r.get("tags").cloned().unwrap_or_else(|| json!([])),
            "pinned": r.get("pinned").and_then(Value::as_bool).unwrap_or(false),
        }),
        id,
    })
}

fn map_task(r: &Value) -> Option<Mapped> {
    let id = id_of(r)?;
    let completed = r
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| first_str(r, &["status"]).as_deref() == Some("completed"));
    Some(Mapped {
        title: first_str(r, &["title", "name"]).unwrap_or_else(|| "Untitled task".into()),
        content: first_str(r, &["description", "content", "notes"]).unwrap_or_default(),
        date: first_str(r, &["dueDate", "due_date", "createdAt", "created_at"]),
        url: Some(format!("/tasks/{}", id)),
        metadata: json!({
            "status": first_str(r, &["status"]),
            "priority": first_str(r, &["priority"]),
            "completed": completed,
        }),
        id,
    })
}

fn map_document(r: &Value) -> Option<Mapped> {
    let id = id_of(r)?;
    Some(Mapped {
        title: first_str(r, &["title", "name", "originalName", "filename"])
            .unwrap_or_else(|| "Untitled document".into()),
        content: first_str(r, &["summary", "content", "text", "extractedText"]).unwrap_or_default(),
        date: first_str(r, &["uploadedAt", "uploaded_at", "createdAt", "created_at"]),
        url: first_str(r, &["url", "fileUrl", "path"]).or_else(|| Some(format!("/documents/{}", id))),
        metadata: json!({
            "mimeType": first_str(r, &["mimeType", "mimetype", "type"]),
            "size": r.get("size").cloned().unwrap_or(Value::Null),
        }),
        id,
    })
}

fn map_reminder(r: &Value) -> Option<Mapped> {
    let id = id_of(r)?;
    Some(Mapped {
        title: first_str(r, &["title", "name"]).unwrap_or_else(|| "Reminder".into()),
        content: first_str(r, &["description", "note", "message"]).unwrap_or_default(),
        date: first_str(r, &["reminderTime", "remindAt", "dueDate", "date"]),
        url: Some(format!("/reminders/{}", id)),
        metadata: json!({
            "completed": r.get("completed").and_then(Value::as_bool).unwrap_or(false),
            "repeat": first_str(r, &["repeat", "recurrence"]),
        }),
        id,
    })
}

/// Dictionary entries: the public API shape
/// `{ word, phonetic, meanings: [{ partOfSpeech, definitions: [{ definition }] }] }`
/// or a saved-word record with `id`, `word`, and `definition`.
fn map_dictionary_entry(r: &Value) -> Option<Mapped> {
    let word = first_str(r, &["word", "title"])?;
    let id = id_of(r).unwrap_or_else(|| word.to_lowercase());

    let mut lines: Vec<String> = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    if let Some(meanings) = r.get("meanings").and_then(Value::as_array) {
        for meaning in meanings {
            let pos = first_str(meaning, &["partOfSpeech"]).unwrap_or_default();
            if !pos.is_empty() && !parts.contains(&pos) {
                parts.push(pos.clone());
            }
            for def in meaning
                .get("definitions")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let Some(text) = first_str(def, &["definition"]) {
                    if pos.is_empty() {
                        lines.push(text);
                    } else {
                        lines.push(format!("{}: {}", pos, text));
                    }
                }
            }
        }
    }
    if lines.is_empty() {
        if let Some(def) = first_str(r, &["definition", "content"]) {
            lines.push(def);
        }
    }

    Some(Mapped {
        url: Some(format!("/dictionary?word={}", encode(&word))),
        title: word,
        content: lines.join("\n"),
        date: first_str(r, &["savedAt", "createdAt"]),
        metadata: json!({
            "phonetic": first_str(r, &["phonetic"]),
            "partsOfSpeech": parts,
        }),
        id,
    })
}

/// Percent-encode a query-string component.
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_list_shapes() {
        let arr = json!([{"id": 1}]);
        assert_eq!(extract_list(&arr, Category::Notes).unwrap().len(), 1);

        let wrapped = json!({"results": [{"id": 1}, {"id": 2}]});
        assert_eq!(extract_list(&wrapped, Category::Notes).unwrap().len(), 2);

        let named = json!({"notes": [{"id": 1}]});
        assert_eq!(extract_list(&named, Category::Notes).unwrap().len(), 1);

        assert!(extract_list(&Value::Null, Category::Notes).unwrap().is_empty());
        assert!(extract_list(&json!({"ok": true}), Category::Notes).is_err());
        assert!(extract_list(&json!("nope"), Category::Notes).is_err());
    }

    #[test]
    fn test_note_mapping() {
        let rec = json!({"id": 1, "title": "Project Plan", "content": "Milestones for the project", "tags": ["work"]});
        let item = map_record(Category::Notes, &rec, "project").unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.kind, "note");
        assert_eq!(item.title, "Project Plan");
        assert_eq!(item.url.as_deref(), Some("/notes/1"));
        assert_eq!(item.metadata["tags"][0], "work");
        assert!(item.snippet.contains("project"));
    }

    #[test]
    fn test_task_mapping_status() {
        let rec = json!({"_id": "t9", "title": "Ship", "status": "completed", "dueDate": "2026-01-01"});
        let item = map_record(Category::Tasks, &rec, "ship").unwrap();
        assert_eq!(item.id, "t9");
        assert_eq!(item.metadata["completed"], true);
        assert_eq!(item.date.as_deref(), Some("2026-01-01"));
        // Empty content: snippet comes from the title
        assert_eq!(item.snippet, "Ship");
    }

    #[test]
    fn test_chat_mapping_joins_messages() {
        let rec = json!({"id": "c1", "title": "Trip", "messages": [
            {"role": "user", "content": "Plan a trip"},
            {"role": "assistant", "content": "Sure, where to?"}
        ]});
        let item = map_record(Category::Chats, &rec, "trip").unwrap();
        assert_eq!(item.content, "Plan a trip\nSure, where to?");
        assert_eq!(item.metadata["messageCount"], 2);
        assert_eq!(item.url.as_deref(), Some("/chat/c1"));
    }

    #[test]
    fn test_dictionary_api_shape() {
        let rec = json!({
            "word": "serendipity",
            "phonetic": "/ˌsɛɹ.ənˈdɪp.ɪ.ti/",
            "meanings": [{"partOfSpeech": "noun", "definitions": [{"definition": "A fortunate discovery by chance."}]}]
        });
        let item = map_record(Category::Dictionary, &rec, "serendipity").unwrap();
        assert_eq!(item.id, "serendipity");
        assert_eq!(item.content, "noun: A fortunate discovery by chance.");
        assert_eq!(item.metadata["partsOfSpeech"][0], "noun");
        assert_eq!(item.url.as_deref(), Some("/dictionary?word=serendipity"));
    }

    #[test]
    fn test_records_without_id_dropped() {
        let recs = vec![json!({"title": "no id"}), json!({"id": 2, "title": "ok"})];
        assert_eq!(map_records(Category::Notes, &recs, "x").len(), 1);
    }

    #[test]
    fn test_map_matching_filters() {
        let recs = vec![
            json!({"id": 1, "title": "Groceries", "content": "milk"}),
            json!({"id": 2, "title": "Project", "content": "plan"}),
        ];
        let items = map_matching(Category::Notes, &recs, "PROJ");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "2");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("a b&c"), "a+b%26c");
    }
}
