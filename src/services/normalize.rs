// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The single conversion boundary from backend records to view types.
//!
//! Principals become canonical text, backend integers become `u64`, and
//! nanosecond timestamps become milliseconds. Anything that does not convert
//! is a `Validation` error; nothing here substitutes a default.

use crate::error::Result;
use crate::models::{
    GroupInfo, GroupRecord, ItemDetail, Message, Nat, NoteNft, NoteRecord, SearchItem, User,
};
use crate::time_utils::{format_millis_rfc3339, nanos_to_millis};

pub fn nat(value: &Nat) -> Result<u64> {
    value.to_u64()
}

pub fn timestamp_ms(nanos: &Nat) -> Result<u64> {
    Ok(nanos_to_millis(nanos.to_u64()?))
}

pub fn group(id: &Nat, record: &GroupRecord) -> Result<GroupInfo> {
    let created_at_ms = timestamp_ms(&record.created_at)?;
    Ok(GroupInfo {
        id: nat(id)?.to_string(),
        name: record.name.clone(),
        creator_text: record.creator.to_text(),
        member_texts: record.members.iter().map(|m| m.to_text()).collect(),
        created_at_ms,
        created_at: format_millis_rfc3339(created_at_ms),
    })
}

pub fn groups(records: &[(Nat, GroupRecord)]) -> Result<Vec<GroupInfo>> {
    records.iter().map(|(id, g)| group(id, g)).collect()
}

pub fn note(record: &NoteRecord) -> Result<NoteNft> {
    Ok(NoteNft {
        id: nat(&record.id)?.to_string(),
        title: record.title.clone(),
        subject: record.subject.clone(),
        price_tokens: nat(&record.price)?,
        owner_text: record.owner.to_text(),
    })
}

pub fn notes(records: &[NoteRecord]) -> Result<Vec<NoteNft>> {
    records.iter().map(note).collect()
}

pub fn message_texts(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.content.clone()).collect()
}

// ─── Search hits ─────────────────────────────────────────────

pub fn group_item(info: GroupInfo) -> SearchItem {
    SearchItem {
        id: info.id,
        label: info.name,
        detail: ItemDetail::Group {
            creator_text: info.creator_text,
            member_count: info.member_texts.len(),
            created_at_ms: info.created_at_ms,
        },
    }
}

pub fn note_item(note: NoteNft) -> SearchItem {
    SearchItem {
        id: note.id,
        label: note.title,
        detail: ItemDetail::Note {
            subject: note.subject,
            price_tokens: note.price_tokens,
            owner_text: note.owner_text,
        },
    }
}

pub fn user_item(user: &User) -> SearchItem {
    let principal_text = user.principal.to_text();
    SearchItem {
        id: principal_text.clone(),
        label: user.username.clone(),
        detail: ItemDetail::User { principal_text },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Principal;

    fn record(created_at: &str) -> GroupRecord {
        GroupRecord {
            name: "Calculus".to_string(),
            creator: Principal::anonymous(),
            members: vec![Principal::anonymous()],
            created_at: Nat::parse(created_at).unwrap(),
        }
    }

    #[test]
    fn test_group_normalization() {
        let info = group(&Nat::from(7), &record("1700000000000000000")).unwrap();
        assert_eq!(info.id, "7");
        assert_eq!(info.creator_text, "2vxsx-fae");
        assert_eq!(info.member_texts, vec!["2vxsx-fae"]);
        assert_eq!(info.created_at_ms, 1_700_000_000_000);
        assert_eq!(info.created_at.as_deref(), Some("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn test_oversized_timestamp_is_validation_error() {
        let err = group(&Nat::from(1), &record("99999999999999999999999")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_note_normalization() {
        let note = note(&NoteRecord {
            id: Nat::from(3),
            title: "Limits".to_string(),
            subject: "Math".to_string(),
            content: "epsilon".to_string(),
            price: Nat::from(25),
            owner: Principal::anonymous(),
        })
        .unwrap();
        assert_eq!(note.id, "3");
        assert_eq!(note.price_tokens, 25);
        assert_eq!(note.owner_text, "2vxsx-fae");
    }
}
