//! A bounded worker pool dedicated to per-region-file tasks during a
//! snapshot or restore. Each job owns a distinct target file, so workers
//! share nothing but the job and result queues.

use crossbeam_channel::bounded;
use tracing::warn;

/// Run `task` once per item in `items`, spread across up to `workers`
/// threads, and collect every result in input order.
pub fn run_pool<T, R, F>(items: Vec<T>, workers: usize, task: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    if count == 0 {
        return Vec::new();
    }
    let workers = workers.max(1).min(count);

    let (job_tx, job_rx) = bounded::<(usize, T)>(count);
    let (result_tx, result_rx) = bounded::<(usize, R)>(count);

    for (i, item) in items.into_iter().enumerate() {
        job_tx.send((i, item)).expect("channel sized to item count");
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let task = &task;
            scope.spawn(move || {
                while let Ok((index, item)) = job_rx.recv() {
                    let result = task(item);
                    if result_tx.send((index, result)).is_err() {
                        warn!("worker pool result channel closed early");
                    }
                }
            });
        }
        drop(result_tx);

        let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
        for (index, result) in result_rx.iter() {
            slots[index] = Some(result);
        }
        slots.into_iter().map(|s| s.expect("every dispatched job reports exactly one result")).collect()
    })
}
