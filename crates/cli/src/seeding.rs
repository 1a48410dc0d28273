//! Seeds sample tasks so `--offline` runs have something to show.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};

use crate::core::wire::TaskRequest;
use crate::core::{MemoryGateway, TaskGateway};
use crate::model::{Category, ListQuery, Priority, TaskDraft};

struct SampleSeed {
    title: &'static str,
    description: &'static str,
    category: Category,
    priority: Priority,
    due_in_days: Option<i64>,
}

const SAMPLE_SEEDS: &[SampleSeed] = &[
    SampleSeed {
        title: "Finish quarterly report",
        description: "Numbers from finance are in the shared drive",
        category: Category::Work,
        priority: Priority::High,
        due_in_days: Some(2),
    },
    SampleSeed {
        title: "Book dentist appointment",
        description: "",
        category: Category::Personal,
        priority: Priority::Medium,
        due_in_days: Some(-1),
    },
    SampleSeed {
        title: "Read the async chapter",
        description: "Pinning and wakers",
        category: Category::Learning,
        priority: Priority::Low,
        due_in_days: None,
    },
];

/// Populate an empty in-process server with the sample tasks.
pub(crate) async fn seed_sample_tasks(
    gateway: &MemoryGateway,
    now: DateTime<Utc>,
) -> Result<usize> {
    let existing = gateway
        .list(&ListQuery::default())
        .await
        .map_err(|err| anyhow!("failed to inspect sample server: {}", err))?;
    if !existing.content.is_empty() {
        return Ok(0);
    }

    for seed in SAMPLE_SEEDS {
        let mut draft = TaskDraft::new(seed.title, seed.category, seed.priority)
            .with_description(seed.description);
        if let Some(days) = seed.due_in_days {
            draft = draft.with_deadline(now + Duration::days(days));
        }
        gateway
            .create(&TaskRequest::from(&draft))
            .await
            .map_err(|err| anyhow!("failed to seed sample task: {}", err))?;
    }
    Ok(SAMPLE_SEEDS.len())
}
