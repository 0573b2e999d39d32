use readthrough::instrument::{Logged, Timed, Traced};
use readthrough::{FetchError, Source};
use readthrough_test::TestSource;

fn failing_source() -> TestSource {
    TestSource::new(|id, _| {
        if id == 0 {
            Err(FetchError::NotFound)
        } else {
            Ok(format!("test{id}"))
        }
    })
}

#[tokio::test]
async fn test_timed_passes_results_through() {
    let source = Timed::new(failing_source());
    assert_eq!(source.fetch(1).await.unwrap(), "test1");
    assert_eq!(source.fetch(0).await.unwrap_err(), FetchError::NotFound);
}

#[tokio::test]
async fn test_traced_passes_results_through() {
    let source = Traced::new(failing_source());
    assert_eq!(source.fetch(1).await.unwrap(), "test1");
    assert_eq!(source.fetch(0).await.unwrap_err(), FetchError::NotFound);
}

#[tokio::test]
async fn test_logged_passes_results_through() {
    let source = Logged::new(failing_source());
    assert_eq!(source.fetch(1).await.unwrap(), "test1");
    assert_eq!(source.fetch(0).await.unwrap_err(), FetchError::NotFound);
}

#[tokio::test]
async fn test_decorators_stack() {
    let source = Logged::new(Traced::new(Timed::new(TestSource::keyed())));
    assert_eq!(source.fetch(7).await.unwrap(), "test7");
}
