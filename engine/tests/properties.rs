//! Property tests for the merge and query layers.

use proptest::prelude::*;
use tasksync_engine::{
    filter_by_search, merge_remote, sort_tasks, stats, Backup, RemoteTask, SortField, SortOrder,
    Task, TaskCollection, TaskDraft,
};

fn remote_task_strategy() -> impl Strategy<Value = RemoteTask> {
    (
        1u32..500,
        "[a-zA-Z ]{1,20}",
        proptest::option::of("[a-z]{1,10}"),
        any::<bool>(),
    )
        .prop_map(|(id, title, category, completed)| RemoteTask {
            id: format!("srv-{id}"),
            title,
            description: None,
            team_members: None,
            category,
            date: None,
            start_time: None,
            end_time: None,
            completed,
            created_at: "t0".into(),
            updated_at: "t0".into(),
        })
}

fn remote_set_strategy() -> impl Strategy<Value = Vec<RemoteTask>> {
    proptest::collection::vec(remote_task_strategy(), 0..20).prop_map(|mut tasks| {
        // server ids are unique
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        tasks.dedup_by(|a, b| a.id == b.id);
        tasks
    })
}

fn local_collection_strategy() -> impl Strategy<Value = TaskCollection> {
    proptest::collection::vec(("[a-zA-Z ]{1,20}", any::<bool>()), 0..10).prop_map(|drafts| {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, (title, completed))| {
                let mut task = Task::from_draft(TaskDraft::new(title), format!("local-{i}"), "t0");
                task.completed = completed;
                task
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn backup_roundtrip_is_lossless(collection in local_collection_strategy()) {
        let backup = Backup::from_collection(&collection, "now");
        let json = backup.to_json().unwrap();
        let restored = Backup::from_json(&json).unwrap().into_collection();
        prop_assert_eq!(restored, collection);
    }

    #[test]
    fn merge_is_idempotent(remote in remote_set_strategy()) {
        let mut once = TaskCollection::new();
        merge_remote(&mut once, remote.clone());

        let mut twice = once.clone();
        let second = merge_remote(&mut twice, remote);

        prop_assert!(second.is_noop());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_drops_pending_records(
        remote in remote_set_strategy(),
        locals in local_collection_strategy(),
    ) {
        let mut collection = locals.clone();
        merge_remote(&mut collection, remote);

        for task in locals.iter() {
            prop_assert!(collection.contains(&task.local_id));
        }
    }

    #[test]
    fn blank_search_keeps_all_visible(collection in local_collection_strategy()) {
        let hits = filter_by_search(collection.tasks(), "");
        prop_assert_eq!(hits.len(), collection.len());
    }

    #[test]
    fn search_is_case_insensitive(
        collection in local_collection_strategy(),
        query in "[a-zA-Z]{1,5}",
    ) {
        let lower = filter_by_search(collection.tasks(), &query.to_lowercase());
        let upper = filter_by_search(collection.tasks(), &query.to_uppercase());
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn stats_counts_are_consistent(collection in local_collection_strategy()) {
        let s = stats(collection.tasks());
        prop_assert_eq!(s.completed + s.pending, s.total);
        prop_assert!(s.completion_rate >= 0.0 && s.completion_rate <= 100.0);
    }

    #[test]
    fn sort_is_a_permutation(collection in local_collection_strategy()) {
        let sorted = sort_tasks(
            collection.visible().collect(),
            SortField::Title,
            SortOrder::Asc,
        );
        prop_assert_eq!(sorted.len(), collection.len());

        for pair in sorted.windows(2) {
            prop_assert!(pair[0].title.to_lowercase() <= pair[1].title.to_lowercase());
        }
    }
}
