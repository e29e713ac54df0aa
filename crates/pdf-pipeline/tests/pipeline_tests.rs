use pdf_pipeline::*;
use std::num::NonZeroUsize;
use std::time::Duration;

fn chunks_of(n: usize, k: usize) -> Vec<Chunk<usize>> {
    distribute((0..n).collect(), NonZeroUsize::new(k).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_streams_every_item_and_completes() {
    let pipeline = TaskPipeline::default();
    let mut session = pipeline.submit(chunks_of(10, 3), |ctx, chunk| {
        for item in chunk.items {
            ctx.write_output(item * 10);
        }
        Ok::<_, String>(chunk.id.0)
    });

    let mut outputs = session.wait_for_all().await;
    outputs.sort_unstable();
    assert_eq!(outputs, (0..10).map(|i| i * 10).collect::<Vec<_>>());
    assert!(session.all_done());
    assert_eq!(session.state(), SessionState::Completed);

    let results = session.results().await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.values().all(ChunkOutcome::is_finished));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_results_before_done_is_pending() {
    let pipeline = TaskPipeline::default();
    let mut session = pipeline.submit(chunks_of(1, 1), |_ctx: &TaskContext<()>, _chunk| {
        std::thread::sleep(Duration::from_millis(300));
        Ok::<_, String>(())
    });

    assert!(matches!(session.results().await, Err(PipelineError::SessionPending)));
    session.wait_for_all().await;
    assert!(session.results().await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_and_panicked_chunks_do_not_abort_siblings() {
    let pipeline = TaskPipeline::default();
    let mut session = pipeline.submit(chunks_of(3, 3), |ctx: &TaskContext<usize>, chunk| {
        match chunk.id.0 {
            0 => Err("cannot open source".to_string()),
            1 => panic!("boom"),
            _ => {
                ctx.write_output(chunk.items[0]);
                Ok(chunk.len())
            }
        }
    });

    let outputs = session.wait_for_all().await;
    assert_eq!(outputs, vec![2]);

    let results = session.results().await.unwrap();
    assert!(matches!(results.get(&ChunkId(0)), Some(ChunkOutcome::Failed(e)) if e == "cannot open source"));
    assert!(matches!(results.get(&ChunkId(1)), Some(ChunkOutcome::Panicked(m)) if m == "boom"));
    assert!(matches!(results.get(&ChunkId(2)), Some(ChunkOutcome::Finished(1))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_stops_workers_between_items() {
    let pipeline = TaskPipeline::default();
    let mut session = pipeline.submit(chunks_of(40, 2), |ctx: &TaskContext<usize>, chunk| {
        let mut done = 0;
        for item in chunk.items {
            if ctx.is_cancelled() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
            ctx.write_output(item);
            done += 1;
        }
        Ok::<_, String>(done)
    });

    tokio::time::sleep(Duration::from_millis(70)).await;
    session.cancel_all(true);
    assert_eq!(session.state(), SessionState::Draining);

    let outputs = session.wait_for_all().await;
    assert!(!outputs.is_empty());
    assert!(outputs.len() < 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_destroy_is_idempotent() {
    let pipeline = TaskPipeline::default();
    let mut session = pipeline.submit(chunks_of(4, 2), |ctx: &TaskContext<usize>, chunk| {
        for item in chunk.items {
            ctx.write_output(item);
        }
        Ok::<_, String>(())
    });

    session.wait_for_all().await;
    session.destroy();
    session.destroy();
    assert_eq!(session.state(), SessionState::Destroyed);
    assert!(session.poll_outputs(false).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_channel_does_not_deadlock() {
    let pipeline = TaskPipeline::new(PipelineConfig {
        channel_capacity: 1,
        poll_interval: Duration::from_millis(10),
    });
    let mut session = pipeline.submit(chunks_of(50, 4), |ctx: &TaskContext<usize>, chunk| {
        for item in chunk.items {
            ctx.write_output(item);
        }
        Ok::<_, String>(())
    });

    let outputs = session.wait_for_all().await;
    assert_eq!(outputs.len(), 50);
}
