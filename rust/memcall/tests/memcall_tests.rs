use memcall::{alloc, free, page_size, MemcallError};
use serial_test::serial;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_cycle() {
    init_logging();
    let buffer = alloc(32).expect("Failed to allocate memory");

    assert_eq!(buffer.len(), 32, "allocation has invalid size");
    assert!(buffer.iter().all(|&b| b == 0), "allocated memory not zeroed");

    for byte in buffer.iter_mut() {
        *byte = 1;
    }
    assert!(buffer.iter().all(|&b| b == 1), "read back data different to what was written");

    free(buffer).expect("Failed to free memory");
}

#[test]
#[serial]
fn test_multi_mebibyte_region() {
    init_logging();
    let size = 4 * 1024 * 1024;
    let buffer = alloc(size).expect("Failed to allocate memory");

    buffer.fill(b'Q');
    assert_eq!(buffer[0], b'Q');
    assert_eq!(buffer[size - 1], b'Q');

    free(buffer).expect("Failed to free memory");
}

#[test]
fn test_page_size() {
    let size = page_size();
    assert!(size > 0, "Page size should be greater than zero");
    assert!(size.is_power_of_two(), "Page size should be a power of 2");
}

#[test]
fn test_empty_free_is_noop() {
    let mut empty: [u8; 0] = [];
    free(&mut empty).expect("Freeing an empty slice should succeed");
}

/// A request no host can satisfy must surface as exhaustion, not a panic.
#[cfg(all(unix, target_pointer_width = "64"))]
#[test]
fn test_impossible_request_reports_exhaustion() {
    init_logging();
    match alloc(usize::MAX / 2) {
        Err(err) => assert!(
            matches!(err, MemcallError::ResourceLimit(_)) && err.is_exhaustion(),
            "unexpected error: {}",
            err
        ),
        Ok(region) => {
            free(region).expect("Failed to free memory");
            panic!("half the address space should not be mappable");
        }
    }
}
