use crate::store::Post;
use chrono::{DateTime, Utc};
use std::collections::BinaryHeap;

/// Merge several timelines into one feed, newest post first.
///
/// Each timeline must be in posting order (oldest first), which is how `UserRecord` appends
/// them. The heap holds at most one cursor per timeline, pointing at its newest unmerged post.
pub(crate) fn merge_newest_first(timelines: &[&[Post]]) -> Vec<Post> {
    let total = timelines.iter().map(|t| t.len()).sum();
    let mut feed = Vec::with_capacity(total);

    let mut heap: BinaryHeap<(DateTime<Utc>, usize, usize)> = timelines
        .iter()
        .enumerate()
        .filter_map(|(timeline, posts)| posts.last().map(|post| (post.posted_at, timeline, posts.len() - 1)))
        .collect();

    while let Some((_, timeline, position)) = heap.pop() {
        let posts = timelines[timeline];
        feed.push(posts[position].clone());
        if position > 0 {
            let next = position - 1;
            heap.push((posts[next].posted_at, timeline, next));
        }
    }

    feed
}
