//! # 태그 동기화기 (Tag Synchronizer)
//!
//! 노트를 쓸 때마다 세 가지 기록을 맞춥니다:
//! 1. 노트 자신의 태그 이름 캐시 (`notes.tags`, 원본 아님)
//! 2. 정규 태그 (`tags`, 소유자별 소문자 이름당 하나)
//! 3. 노트-태그 피벗 (`note_tags`)
//!
//! ## 실패 정책
//! 태그/피벗 작업은 모두 "최선 노력(best-effort)"입니다.
//! 한 태그의 실패가 다른 태그 처리를 막지 않고, 노트 저장 자체를 실패시키지도 않습니다.
//! 대신 실패한 태그 이름을 `SyncReport::Partial`로 돌려주어 호출자가 상태를 알 수 있게 합니다.
//! 기존 피벗조차 읽지 못했다면 `SyncReport::Unreconciled`입니다.
//! 에러(`SyncError`)로 전파되는 것은 사전조건 위반(소유자/노트 ID 누락)뿐입니다.
//!
//! ## 동시성
//! 한 번의 호출 안에서 저장소 요청은 순서대로 하나씩 await합니다. 잠금은 없습니다.
//! 같은 태그를 두 요청이 동시에 만들면 한쪽은 UNIQUE 충돌로 실패하고, 재조회로 이긴 쪽의 행을 찾습니다.
//! 같은 노트에 피벗을 동시에 만드는 경쟁은 막지 않으며, 다음 `sync_on_update`가 중복 피벗을 정리합니다.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::db::{Clock, PivotStore, SystemClock, TagStore};
use crate::error::AppError;
use crate::models::{NewNoteTag, NewTag, NoteTag, Tag};

/// 노트 하나의 피벗을 조회할 때의 최대 행 수
pub const PIVOT_PAGE_SIZE: i64 = 500;

/// 목록 조회 시 한 번에 묶어 읽는 노트 수
const NOTE_ID_CHUNK: usize = 100;

/// 묶음 피벗 조회의 최대 행 수
const BATCH_PIVOT_LIMIT: i64 = 1000;

/// 동기화를 시작조차 할 수 없는 사전조건 위반
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("an authenticated owner is required to sync tags")]
    MissingOwner,
    #[error("a persisted note id is required to sync tags")]
    MissingNote,
}

/// 동기화 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// 요청한 태그가 모두 반영됨
    Synced,
    /// 일부 태그가 반영되지 못함. 노트 저장은 성공한 상태입니다.
    Partial { failed: Vec<String> },
    /// 기존 피벗을 읽지 못해 비교를 건너뜀. 기존 피벗은 그대로 남아 있습니다.
    /// `failed`에는 이번 호출에서 확보한 태그까지 모두 담깁니다.
    Unreconciled { failed: Vec<String> },
}

impl SyncReport {
    fn from_failures(failed: Vec<String>) -> Self {
        if failed.is_empty() {
            return SyncReport::Synced;
        }
        SyncReport::Partial {
            failed: dedupe(failed),
        }
    }

    fn unreconciled(failed: Vec<String>) -> Self {
        SyncReport::Unreconciled {
            failed: dedupe(failed),
        }
    }

    /// 반영되지 못한 태그 이름 목록 (완전히 동기화되었으면 빈 슬라이스)
    pub fn failed_tags(&self) -> &[String] {
        match self {
            SyncReport::Synced => &[],
            SyncReport::Partial { failed } | SyncReport::Unreconciled { failed } => {
                failed.as_slice()
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SyncReport::Synced)
    }

    /// 기존 피벗과 비교까지 마쳤는지 여부
    pub fn is_reconciled(&self) -> bool {
        !matches!(self, SyncReport::Unreconciled { .. })
    }
}

fn dedupe(mut names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names
}

/// 태그 이름을 소문자로 접습니다. 로케일은 고려하지 않습니다.
pub fn fold_tag_name(name: &str) -> String {
    name.to_lowercase()
}

/// 입력 태그 이름을 정규화합니다.
///
/// 앞뒤 공백을 제거하고 빈 문자열을 버린 뒤, 소문자로 접은 키가 같은 이름은
/// 처음 나온 표기 하나만 남깁니다. 입력 순서는 유지됩니다.
///
/// ```text
/// ["alpha", "Alpha", " alpha ", "", "Beta"] → ["alpha", "Beta"]
/// ```
pub fn normalize_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen_keys = HashSet::new();
    names
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen_keys.insert(fold_tag_name(name)))
        .map(str::to_string)
        .collect()
}

/// 피벗 행들의 표시 이름을 처음 나온 순서대로 중복 없이 모읍니다.
fn display_names<'a>(rows: impl IntoIterator<Item = &'a NoteTag>) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter_map(|row| row.tag.as_deref())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

fn check_preconditions(note_id: &str, owner_id: &str) -> Result<(), SyncError> {
    if owner_id.trim().is_empty() {
        return Err(SyncError::MissingOwner);
    }
    if note_id.trim().is_empty() {
        return Err(SyncError::MissingNote);
    }
    Ok(())
}

/// 태그 동기화기
///
/// 저장소(`S`)와 시계(`C`)를 명시적으로 주입받습니다. 전역 상태는 없습니다.
#[derive(Clone)]
pub struct TagSynchronizer<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S, C> TagSynchronizer<S, C>
where
    S: TagStore + PivotStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// 새 노트에 태그를 붙입니다. 노트 생성이 성공한 뒤에 호출합니다.
    ///
    /// ## 처리 순서
    /// 1. 입력 정규화
    /// 2. 정규 태그 일괄 조회 → 없는 태그 생성 (실패 시 재조회)
    /// 3. 노트의 기존 피벗 조회 (생성 직후라 보통 비어 있음)
    /// 4. 아직 연결되지 않은 태그마다 피벗 생성
    pub async fn sync_on_create(
        &self,
        note_id: &str,
        owner_id: &str,
        tag_names: &[String],
    ) -> Result<SyncReport, SyncError> {
        check_preconditions(note_id, owner_id)?;

        let names = normalize_tag_names(tag_names);
        if names.is_empty() {
            return Ok(SyncReport::Synced);
        }

        let mut failed = Vec::new();
        let resolved = self.resolve_tags(owner_id, &names, &mut failed).await;

        let existing = match self.store.list_note_tags(note_id, PIVOT_PAGE_SIZE).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to list pivots for note {}: {}", note_id, e);
                failed.extend(resolved_names(&names, &resolved));
                return Ok(SyncReport::unreconciled(failed));
            }
        };

        let mut linked: HashSet<String> =
            existing.iter().filter_map(|row| row.tag_id.clone()).collect();
        self.attach_missing(note_id, owner_id, &names, &resolved, &mut linked, &mut failed)
            .await;

        Ok(SyncReport::from_failures(failed))
    }

    /// 노트 수정 후 태그 목록을 맞춥니다.
    ///
    /// `tag_names`가 None이면 요청에 태그 필드가 없었던 것이므로 아무것도 하지 않습니다.
    ///
    /// ## 처리 순서
    /// 1. 입력 정규화, 정규 태그 확보 (생성 경로와 동일)
    /// 2. 기존 피벗 조회
    /// 3. `tag_id` 없는 레거시 피벗에 태그 ID 보충 (소문자 키로 매칭)
    /// 4. 원하는 태그 ID 집합과 기존 피벗 비교
    ///    - 원하는데 없는 태그 → 피벗 생성
    ///    - 양쪽에 있는 태그 → 그대로 둠
    ///    - 더 이상 원하지 않는 피벗 → 삭제
    ///
    /// 삭제 판정은 표시 이름의 **정확한 문자열 일치**로 합니다 (대소문자 구분).
    /// `tag_id`가 있는 피벗은 ID도 원하는 집합에 있어야 남습니다.
    pub async fn sync_on_update(
        &self,
        note_id: &str,
        owner_id: &str,
        tag_names: Option<&[String]>,
    ) -> Result<SyncReport, SyncError> {
        check_preconditions(note_id, owner_id)?;

        let Some(tag_names) = tag_names else {
            return Ok(SyncReport::Synced);
        };

        let names = normalize_tag_names(tag_names);
        let mut failed = Vec::new();
        let resolved = if names.is_empty() {
            HashMap::new()
        } else {
            self.resolve_tags(owner_id, &names, &mut failed).await
        };

        let mut existing = match self.store.list_note_tags(note_id, PIVOT_PAGE_SIZE).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to list pivots for note {}: {}", note_id, e);
                failed.extend(resolved_names(&names, &resolved));
                return Ok(SyncReport::unreconciled(failed));
            }
        };

        self.backfill_legacy(note_id, &mut existing, &resolved).await;

        let desired_ids: HashSet<&str> = names
            .iter()
            .filter_map(|name| resolved.get(&fold_tag_name(name)))
            .map(|tag| tag.id.as_str())
            .collect();
        let desired_names: HashSet<&str> = names.iter().map(String::as_str).collect();

        // 남길 피벗과 지울 피벗을 가릅니다. 같은 tag_id를 가리키는 두 번째 피벗부터는 중복으로 지웁니다.
        let mut linked: HashSet<String> = HashSet::new();
        let mut stale: Vec<&NoteTag> = Vec::new();
        for row in &existing {
            let keep = match (&row.tag_id, &row.tag) {
                // 표시 이름 사본까지 일치해야 남깁니다. "Work" → "work"처럼 표기만 바뀌어도 새로 붙입니다.
                (Some(tag_id), name) => {
                    desired_ids.contains(tag_id.as_str())
                        && name.as_deref().map_or(true, |name| desired_names.contains(name))
                        && linked.insert(tag_id.clone())
                }
                (None, Some(name)) => {
                    let keep = desired_names.contains(name.as_str());
                    // 남기는 레거시 행이 그 태그를 대신하므로 새 피벗을 만들지 않습니다.
                    if keep {
                        if let Some(tag) = resolved.get(&fold_tag_name(name)) {
                            linked.insert(tag.id.clone());
                        }
                    }
                    keep
                }
                (None, None) => true,
            };
            if !keep {
                stale.push(row);
            }
        }

        self.attach_missing(note_id, owner_id, &names, &resolved, &mut linked, &mut failed)
            .await;

        for row in stale {
            if let Err(e) = self.store.delete_note_tag(&row.id).await {
                let label = row.tag.clone().or_else(|| row.tag_id.clone()).unwrap_or_default();
                tracing::warn!(
                    "Failed to detach stale tag '{}' (pivot {}) from note {}: {}",
                    label,
                    row.id,
                    note_id,
                    e
                );
                failed.push(label);
            }
        }

        Ok(SyncReport::from_failures(failed))
    }

    /// 노트의 태그 표시 이름을 피벗에서 읽어 처음 나온 순서대로 중복 없이 반환합니다.
    ///
    /// 읽기 경로가 노트의 태그 캐시를 새로 고칠 때 사용합니다.
    pub async fn read_note_tags(&self, note_id: &str) -> Result<Vec<String>, AppError> {
        if note_id.trim().is_empty() {
            return Err(SyncError::MissingNote.into());
        }
        let rows = self.store.list_note_tags(note_id, PIVOT_PAGE_SIZE).await?;
        Ok(display_names(&rows))
    }

    /// 여러 노트의 태그를 한꺼번에 읽습니다 (목록 화면용).
    ///
    /// 노트 ID를 100개씩 나누어 조회하며, 묶음마다 최대 `min(1000, 10 × 묶음 크기)`행을 읽습니다.
    /// 피벗이 없는 노트는 결과 맵에 들어가지 않습니다.
    pub async fn read_tags_for_notes(
        &self,
        note_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, AppError> {
        let mut rows_by_note: HashMap<String, Vec<NoteTag>> = HashMap::new();

        for chunk in note_ids.chunks(NOTE_ID_CHUNK) {
            let limit = BATCH_PIVOT_LIMIT.min(chunk.len() as i64 * 10);
            let rows = self.store.list_note_tags_for_notes(chunk, limit).await?;
            for row in rows {
                rows_by_note.entry(row.note_id.clone()).or_default().push(row);
            }
        }

        Ok(rows_by_note
            .into_iter()
            .map(|(note_id, rows)| (note_id, display_names(&rows)))
            .filter(|(_, names)| !names.is_empty())
            .collect())
    }

    /// 이름마다 정규 태그를 확보합니다. 키는 소문자 이름입니다.
    ///
    /// 확보하지 못한 이름은 `failed`에 추가됩니다.
    async fn resolve_tags(
        &self,
        owner_id: &str,
        names: &[String],
        failed: &mut Vec<String>,
    ) -> HashMap<String, Tag> {
        let keys: Vec<String> = names.iter().map(|name| fold_tag_name(name)).collect();

        let mut resolved: HashMap<String, Tag> =
            match self.store.find_tags_by_keys(owner_id, &keys).await {
                Ok(tags) => tags
                    .into_iter()
                    .map(|tag| (tag.name_lower.clone(), tag))
                    .collect(),
                Err(e) => {
                    tracing::warn!("Batched tag lookup failed for owner {}: {}", owner_id, e);
                    HashMap::new()
                }
            };

        for (name, key) in names.iter().zip(keys) {
            if resolved.contains_key(&key) {
                continue;
            }
            match self.create_or_fetch(owner_id, name, &key).await {
                Some(tag) => {
                    resolved.insert(key, tag);
                }
                None => failed.push(name.clone()),
            }
        }

        resolved
    }

    /// 태그를 만들고, 실패하면 한 번 재조회합니다. 그래도 없으면 None입니다.
    async fn create_or_fetch(&self, owner_id: &str, name: &str, key: &str) -> Option<Tag> {
        let new_tag = NewTag {
            name: name.to_string(),
            name_lower: key.to_string(),
            owner_id: owner_id.to_string(),
            created_at: self.clock.now(),
        };

        let create_err = match self.store.insert_tag(&new_tag).await {
            Ok(tag) => return Some(tag),
            Err(e) => e,
        };
        tracing::debug!("Creating tag '{}' failed ({}), re-querying", name, create_err);

        match self.store.find_tags_by_keys(owner_id, &[key.to_string()]).await {
            Ok(tags) => {
                let found = tags.into_iter().find(|tag| tag.name_lower == key);
                if found.is_none() {
                    tracing::warn!("Tag '{}' could not be created or found for owner {}", name, owner_id);
                }
                found
            }
            Err(e) => {
                tracing::warn!("Re-query for tag '{}' failed: {}", name, e);
                None
            }
        }
    }

    /// `tag_id`가 없는 레거시 피벗에, 이번에 확보한 정규 태그의 ID를 채웁니다.
    ///
    /// 보충에 실패한 행은 레거시 상태로 남아 이름 기준으로 처리됩니다.
    async fn backfill_legacy(
        &self,
        note_id: &str,
        rows: &mut [NoteTag],
        resolved: &HashMap<String, Tag>,
    ) {
        for row in rows.iter_mut().filter(|row| row.tag_id.is_none()) {
            let Some(tag) = row.tag.as_deref().and_then(|name| resolved.get(&fold_tag_name(name)))
            else {
                continue;
            };
            match self.store.set_note_tag_tag_id(&row.id, &tag.id).await {
                Ok(()) => row.tag_id = Some(tag.id.clone()),
                Err(e) => tracing::warn!(
                    "Failed to backfill tag id on pivot {} of note {}: {}",
                    row.id,
                    note_id,
                    e
                ),
            }
        }
    }

    /// `linked`에 없는 확보된 태그마다 피벗을 만듭니다.
    async fn attach_missing(
        &self,
        note_id: &str,
        owner_id: &str,
        names: &[String],
        resolved: &HashMap<String, Tag>,
        linked: &mut HashSet<String>,
        failed: &mut Vec<String>,
    ) {
        let now = self.clock.now();

        for name in names {
            // 확보하지 못한 태그는 이미 failed에 들어 있습니다.
            let Some(tag) = resolved.get(&fold_tag_name(name)) else {
                continue;
            };
            if linked.contains(&tag.id) {
                continue;
            }

            let new_row = NewNoteTag {
                note_id: note_id.to_string(),
                tag_id: tag.id.clone(),
                tag: name.clone(),
                owner_id: owner_id.to_string(),
                created_at: now.clone(),
            };
            match self.store.insert_note_tag(&new_row).await {
                Ok(_) => {
                    linked.insert(tag.id.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to attach tag '{}' to note {}: {}", name, note_id, e);
                    failed.push(name.clone());
                }
            }
        }
    }
}

/// 확보에 성공한 이름만 골라냅니다 (피벗 단계 전체가 실패했을 때 보고용).
fn resolved_names(names: &[String], resolved: &HashMap<String, Tag>) -> Vec<String> {
    names
        .iter()
        .filter(|name| resolved.contains_key(&fold_tag_name(name)))
        .cloned()
        .collect()
}
