use super::*;

fn claim_all(queue: &Queue) -> Batch {
    test_selector(queue, 20).select_batch().unwrap()
}

#[test]
fn acknowledge_removes_exactly_the_batch() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 3);
    let batch = test_selector(&queue, 2).select_batch().unwrap();
    let (sink, _seen) = recording_sink();
    let worker = Worker::new(storage.clone(), QUEUE, sink);

    assert_eq!(worker.acknowledge(&batch).unwrap(), 2);
    assert_eq!(stored_ids(&*storage), vec![3]);
}

#[test]
fn acknowledge_tolerates_already_removed_ids() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 2);
    let batch = claim_all(&queue);
    let (sink, _seen) = recording_sink();
    let worker = Worker::new(storage.clone(), QUEUE, sink);

    assert_eq!(worker.acknowledge(&batch).unwrap(), 2);
    assert_eq!(worker.acknowledge(&batch).unwrap(), 0, "already gone");
    assert!(stored_ids(&*storage).is_empty());
}

#[test]
fn failed_acknowledge_removes_nothing() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 2);
    let batch = claim_all(&queue);
    let failing = Arc::new(FailingStorage::new(storage.clone()));
    failing.faults.commit.store(true, Ordering::SeqCst);
    let (sink, _seen) = recording_sink();
    let worker = Worker::new(failing, QUEUE, sink);

    assert!(worker.acknowledge(&batch).is_err());
    assert_eq!(stored_ids(&*storage), vec![1, 2]);
}

#[test]
fn successful_delivery_is_acknowledged() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 2);
    let batch = claim_all(&queue);
    let (sink, seen) = recording_sink();
    let mut worker = Worker::new(storage.clone(), QUEUE, sink);
    let (_batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(0);
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

    let state = worker.step(WorkerState::Delivering(batch.clone()), &batch_rx, &shutdown_rx);
    assert_eq!(state, WorkerState::Acknowledging(batch));
    assert_eq!(seen.try_recv().unwrap(), vec![1, 2]);
    assert_eq!(stored_ids(&*storage), vec![1, 2], "not removed before acknowledging");

    let state = worker.step(state, &batch_rx, &shutdown_rx);
    assert_eq!(state, WorkerState::AwaitingBatch);
    assert!(stored_ids(&*storage).is_empty());
}

#[test]
fn rejected_batch_stays_claimed_until_stale() {
    let (storage, queue, clock, _dir) = test_setup();
    enqueue_n(&queue, 2);
    let batch = claim_all(&queue);
    let claimed_at = clock.now_ns();
    let (sink, seen) = rejecting_sink();
    let mut worker = Worker::new(storage.clone(), QUEUE, sink);
    let (_batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(0);
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

    let state = worker.step(WorkerState::Delivering(batch), &batch_rx, &shutdown_rx);
    assert_eq!(state, WorkerState::AwaitingBatch);
    assert_eq!(seen.try_recv().unwrap(), vec![1, 2]);

    let messages = stored(&*storage);
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.attempted_at == Some(claimed_at)));

    clock.advance(VISIBILITY / 2);
    assert!(claim_all(&queue).is_empty());
    clock.advance(VISIBILITY);
    assert_eq!(claim_all(&queue).ids(), vec![1, 2]);
}

#[test]
fn failed_removal_leaves_batch_for_redelivery() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 1);
    let batch = claim_all(&queue);
    let failing = Arc::new(FailingStorage::new(storage.clone()));
    failing.faults.delete.store(true, Ordering::SeqCst);
    let (sink, _seen) = recording_sink();
    let mut worker = Worker::new(failing, QUEUE, sink);
    let (_batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(0);
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

    let state = worker.step(WorkerState::Acknowledging(batch), &batch_rx, &shutdown_rx);
    assert_eq!(state, WorkerState::AwaitingBatch);
    assert_eq!(stored_ids(&*storage), vec![1]);
}

#[test]
fn awaiting_batch_receives_or_stops() {
    let (storage, queue, _clock, _dir) = test_setup();
    enqueue_n(&queue, 1);
    let batch = claim_all(&queue);
    let (sink, _seen) = recording_sink();
    let mut worker = Worker::new(storage, QUEUE, sink);
    let (batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(1);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

    batch_tx.send(batch.clone()).unwrap();
    let state = worker.step(WorkerState::AwaitingBatch, &batch_rx, &shutdown_rx);
    assert_eq!(state, WorkerState::Delivering(batch));

    drop(shutdown_tx);
    assert_eq!(
        worker.step(WorkerState::AwaitingBatch, &batch_rx, &shutdown_rx),
        WorkerState::Stopped
    );
}

#[test]
fn awaiting_batch_stops_when_selector_hangs_up() {
    let (storage, _queue, _clock, _dir) = test_setup();
    let (sink, _seen) = recording_sink();
    let mut worker = Worker::new(storage, QUEUE, sink);
    let (batch_tx, batch_rx) = crossbeam_channel::bounded::<Batch>(0);
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

    drop(batch_tx);
    assert_eq!(
        worker.step(WorkerState::AwaitingBatch, &batch_rx, &shutdown_rx),
        WorkerState::Stopped
    );
}
