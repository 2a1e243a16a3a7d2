#[cfg(target_os = "linux")]
mod common;

use std::net::{TcpListener, UdpSocket};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use fieldlink::{
	AnyEndpoint, ConnectionRegistry, Endpoint, EndpointConfig, Error, SerialConfig, SerialEndpoint, SharedEndpoint,
	TcpConfig, TcpEndpoint, UdpConfig, open_registered,
};

fn assert_two_registered(config: &EndpointConfig) {
	let registry = ConnectionRegistry::new();

	let first = open_registered(config, &registry).unwrap();
	let second = open_registered(config, &registry).unwrap();

	let found = registry.lookup(config).unwrap();
	assert_eq!(found.len(), 2);
	assert!(SharedEndpoint::ptr_eq(&found[0], &first));
	assert!(SharedEndpoint::ptr_eq(&found[1], &second));

	assert_eq!(registry.evict(config).unwrap(), 2);
	assert!(first.lock().fd().is_none());
	assert!(second.lock().fd().is_none());
	assert!(registry.lookup(config).is_none());
}

#[test]
fn two_connections_to_one_address() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	assert_two_registered(&TcpConfig::new(listener.local_addr().unwrap().to_string()).into());

	let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
	assert_two_registered(&UdpConfig::new(peer.local_addr().unwrap().to_string()).into());
}

#[test]
fn evict_interrupts_a_blocked_read() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let config: EndpointConfig = TcpConfig::new(listener.local_addr().unwrap().to_string())
		.read_timeout(Duration::from_secs(3))
		.into();
	let registry = ConnectionRegistry::new();
	let endpoint = open_registered(&config, &registry).unwrap();
	// accepted but silent
	let (_peer, _) = listener.accept().unwrap();

	let reader = {
		let endpoint = endpoint.clone();
		thread::spawn(move || {
			let started = Instant::now();
			let mut buf = [0u8; 8];
			let result = endpoint.lock().read(&mut buf);
			(result, started.elapsed())
		})
	};
	thread::sleep(Duration::from_millis(100));

	let started = Instant::now();
	assert_eq!(registry.evict(&config).unwrap(), 1);
	let evict_took = started.elapsed();

	let (result, read_took) = reader.join().unwrap();
	// NotOpen only if the reader was scheduled after the close
	assert!(matches!(result, Err(Error::Cancelled | Error::NotOpen)), "{result:?}");
	assert!(evict_took < Duration::from_secs(1), "evict took {evict_took:?}");
	assert!(read_took < Duration::from_secs(2), "read took {read_took:?}");
	assert!(endpoint.lock().fd().is_none());
}

#[test]
fn duplicate_serial_never_touches_the_device() {
	// the path does not exist: reaching open(2) would give SerialOpen, not DuplicateResource
	let config: EndpointConfig = SerialConfig::new("/dev/fieldlink-no-such-tty").into();
	let registry = ConnectionRegistry::new();
	registry.register(&config, AnyEndpoint::from(SerialEndpoint::new()).shared()).unwrap();

	let err = open_registered(&config, &registry).unwrap_err();
	assert!(matches!(err, Error::DuplicateResource { ref address } if address == "/dev/fieldlink-no-such-tty"), "{err}");
	assert_eq!(registry.lookup(&config).map(|v| v.len()), Some(1));
}

#[test]
fn failed_serial_open_releases_the_path() {
	let config: EndpointConfig = SerialConfig::new("/dev/fieldlink-no-such-tty").into();
	let registry = ConnectionRegistry::new();

	assert!(matches!(open_registered(&config, &registry), Err(Error::SerialOpen { .. })));
	assert!(registry.lookup(&config).is_none());
	// the claim is gone: the next failure is again the device, not a duplicate
	assert!(matches!(open_registered(&config, &registry), Err(Error::SerialOpen { .. })));
}

#[test]
fn concurrent_appends_are_not_lost() {
	const THREADS: usize = 16;
	const PER_THREAD: usize = 50;

	let registry = Arc::new(ConnectionRegistry::new());
	let config: EndpointConfig = TcpConfig::new("192.0.2.10:502").into();
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let (registry, config, barrier) = (registry.clone(), config.clone(), barrier.clone());
			thread::spawn(move || {
				barrier.wait();
				for _ in 0..PER_THREAD {
					registry.register(&config, AnyEndpoint::from(TcpEndpoint::new()).shared()).unwrap();
				}
			})
		})
		.collect();
	for h in handles {
		h.join().unwrap();
	}

	assert_eq!(registry.lookup(&config).unwrap().len(), THREADS * PER_THREAD);
}

#[cfg(target_os = "linux")]
#[test]
fn concurrent_serial_opens_have_one_winner() {
	const THREADS: usize = 8;

	let pty = common::Pty::open().unwrap();
	let registry = Arc::new(ConnectionRegistry::new());
	let config: EndpointConfig = SerialConfig::new(&pty.path).into();
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let (registry, config, barrier) = (registry.clone(), config.clone(), barrier.clone());
			thread::spawn(move || {
				barrier.wait();
				open_registered(&config, &registry)
			})
		})
		.collect();

	let mut winners = 0;
	for h in handles {
		match h.join().unwrap() {
			Ok(_) => winners += 1,
			Err(Error::DuplicateResource { .. }) => {}
			Err(e) => panic!("unexpected error: {e}"),
		}
	}
	assert_eq!(winners, 1);
	assert_eq!(registry.lookup(&config).unwrap().len(), 1);
	registry.evict(&config).unwrap();
}
