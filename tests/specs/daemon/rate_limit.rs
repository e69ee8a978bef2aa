//! Rate limiting specs: token bucket over the control socket.

use crate::prelude::Daemon;
use serial_test::serial;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

#[test]
#[serial]
fn burst_is_absorbed_then_excess_is_refused() {
    let daemon = Daemon::start();

    // The bucket starts with a burst of 20 and refills at 10/s. The
    // bucket is charged as each connection is accepted, so open all the
    // connections up front to keep the whole volley inside a fraction
    // of a refill interval, then collect the responses.
    let mut streams = Vec::new();
    for _ in 0..30 {
        let mut stream = UnixStream::connect(daemon.socket_path()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream
            .write_all(br#"{"type":"health","args":{}}"#)
            .unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        streams.push(stream);
    }

    let mut granted = 0;
    let mut refused = 0;
    for mut stream in streams {
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        let response: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        if response["success"] == true {
            granted += 1;
        } else {
            assert_eq!(response["message"], "rate limit exceeded");
            refused += 1;
        }
    }

    assert!(granted >= 20, "burst was not honored: {granted} granted");
    assert!(refused > 0, "no request was ever rate limited");
}
