
use sluice::counter::SlotGrant;
use test_helpers::open_temp_store;

#[tokio::test]
async fn acquire_grants_until_max_then_refuses() {
    let store = open_temp_store(0, 2).await;

    assert_eq!(
        store.acquire_slot().await.unwrap(),
        SlotGrant::Granted(1)
    );
    assert_eq!(
        store.acquire_slot().await.unwrap(),
        SlotGrant::Granted(2)
    );
    assert_eq!(store.acquire_slot().await.unwrap(), SlotGrant::OutOfRange);

    // Refusal wrote nothing
    let record = store.counter().read().await.unwrap();
    assert_eq!(record.count, 2);
}

#[tokio::test]
async fn release_at_min_refuses_and_never_underflows() {
    let store = open_temp_store(0, 2).await;

    assert_eq!(store.release_slot().await.unwrap(), SlotGrant::OutOfRange);
    assert_eq!(store.release_slot().await.unwrap(), SlotGrant::OutOfRange);

    let record = store.counter().read().await.unwrap();
    assert_eq!(record.count, 0);
}

#[tokio::test]
async fn acquire_release_round_trip_stays_in_bounds() {
    let store = open_temp_store(0, 3).await;

    for _ in 0..5 {
        while let SlotGrant::Granted(count) = store.acquire_slot().await.unwrap() {
            assert!(count >= 0 && count <= 3);
        }
        while let SlotGrant::Granted(count) = store.release_slot().await.unwrap() {
            assert!(count >= 0 && count <= 3);
        }
    }

    let record = store.counter().read().await.unwrap();
    assert_eq!(record.count, 0);
}

#[tokio::test]
async fn concurrent_acquires_grant_exactly_spare_capacity() {
    let store = open_temp_store(0, 3).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.acquire_slot().await.unwrap() },
        ));
    }

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            SlotGrant::Granted(_) => granted += 1,
            SlotGrant::OutOfRange => refused += 1,
        }
    }

    assert_eq!(granted, 3);
    assert_eq!(refused, 7);
    let record = store.counter().read().await.unwrap();
    assert_eq!(record.count, 3);
}

#[tokio::test]
async fn seed_does_not_clobber_an_existing_counter() {
    let store = open_temp_store(0, 2).await;
    store.acquire_slot().await.unwrap();

    store.counter().seed(0, 2).await.unwrap();

    let record = store.counter().read().await.unwrap();
    assert_eq!(record.count, 1);
}
