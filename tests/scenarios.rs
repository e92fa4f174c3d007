use std::time::Duration;

use ice_memctl::memctl::codec::{Header, decode_size, encode_size, encode_warmboot};
use ice_memctl::memctl::{FramingError, Op};
use ice_memctl::prelude::*;

fn options() -> ClientOptions {
    ClientOptions {
        reset_settle: Duration::ZERO,
        ..ClientOptions::default()
    }
}

fn client_with(device: Device, shadow: ShadowMemory) -> MemoryClient<SimulatedDevice> {
    MemoryClient::new(SimulatedDevice::new(device), shadow, options()).unwrap()
}

fn words(text: &[&str]) -> Vec<Word> {
    text.iter().map(|w| w.parse().unwrap()).collect()
}

#[test]
fn write_then_read_round_trip() {
    let mut client = client_with(Device::Up5k, ShadowMemory::new(Device::Up5k));

    for (region, block, address, size) in [
        (Region::Bram, 0, 0, 1),
        (Region::Bram, 29, 0, 256),
        (Region::Bram, 12, 200, 56),
        (Region::Spram, 0, 0, 256),
        (Region::Spram, 3, 16128, 256),
        (Region::Spram, 1, 9000, 17),
    ] {
        let data: Vec<Word> = (0..size)
            .map(|i| Word::new((block as u16) << 12 ^ (address + i as u16)))
            .collect();
        client.write(region, block, address, &data).unwrap();
        assert_eq!(client.read(region, block, address, size).unwrap(), data);
        assert!(client.verify(region, block, address, size).unwrap());
    }
}

#[test]
fn verify_needs_content_and_clean_framing() {
    let mut client = client_with(Device::Hx1k, ShadowMemory::new(Device::Hx1k));
    assert!(client.verify(Region::Bram, 3, 0, 8).unwrap());

    // Content alone corrupted
    client
        .transport_mut()
        .poke(Region::Bram, 3, 4, &words(&["0bad"]));
    assert!(!client.verify(Region::Bram, 3, 0, 8).unwrap());
    client.transport_mut().poke(Region::Bram, 3, 4, &[Word::ZERO]);

    // Framing alone corrupted
    client.transport_mut().append_to_next_read(&[0x00, 0x00]);
    assert!(!client.verify(Region::Bram, 3, 0, 8).unwrap());

    assert!(client.verify(Region::Bram, 3, 0, 8).unwrap());
}

#[test]
fn size_and_header_bytes_round_trip() {
    for size in 1..=256 {
        assert_eq!(decode_size(encode_size(size).unwrap()), size);
    }
    assert!(encode_size(0).is_err());
    assert!(encode_size(257).is_err());

    for region in Region::ALL {
        for op in [Op::Read, Op::Write] {
            for block in 0..=63 {
                let header = Header::new(region, op, block);
                assert_eq!(Header::decode(header.encode().unwrap()), header);
            }
        }
    }
}

#[test]
fn warmboot_bytes_are_32_to_35() {
    let bytes: Vec<u8> = (0..4).map(|i| encode_warmboot(i).unwrap()).collect();
    assert_eq!(bytes, [32, 33, 34, 35]);
    for block in 0..32 {
        let header = Header::new(Region::Bram, Op::Read, block).encode().unwrap();
        assert!(!bytes.contains(&header));
    }
}

#[test]
fn read_returns_preloaded_words() {
    let data = words(&["0001", "0002", "0003"]);
    let mut shadow = ShadowMemory::new(Device::Hx1k);
    shadow.load_words(Region::Bram, 0, 10, &data).unwrap();

    let mut client = client_with(Device::Hx1k, shadow);
    client.transport_mut().poke(Region::Bram, 0, 10, &data);

    assert_eq!(client.read(Region::Bram, 0, 10, 3).unwrap(), data);
    assert!(client.verify(Region::Bram, 0, 10, 3).unwrap());
}

#[test]
fn write_two_words_then_verify() {
    let mut client = client_with(Device::Hx1k, ShadowMemory::new(Device::Hx1k));
    client.write_hex(Region::Bram, 1, 0, "aaaa bbbb").unwrap();

    assert!(client.verify(Region::Bram, 1, 0, 2).unwrap());
    assert_eq!(
        client.shadow().words(Region::Bram, 1, 0, 2).unwrap(),
        words(&["aaaa", "bbbb"])
    );
}

#[test]
fn three_of_four_bytes_is_a_framing_error() {
    let mut client = client_with(Device::Hx1k, ShadowMemory::new(Device::Hx1k));
    client.transport_mut().truncate_next_read(1);

    match client.read(Region::Bram, 0, 0, 2) {
        Err(MemctlError::Framing(FramingError::ShortRead { expected, received })) => {
            assert_eq!((expected, received), (4, 3));
        }
        other => panic!("expected a short read, got {other:?}"),
    }
}

#[test]
fn sync_stops_on_third_probe() {
    let mut client = client_with(Device::Hx1k, ShadowMemory::new(Device::Hx1k));
    client.transport_mut().slip_next_reads(2);

    let report = client.sync_device().unwrap();
    assert_eq!(report.attempts, 3);
}

#[test]
fn shadow_survives_save_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ShadowPaths::new(dir.path().join("data.hex"))
        .with_spram(dir.path().join("spram_data.hex"));

    let shadow = ShadowMemory::open(Device::Up5k, paths.clone()).unwrap();
    let mut client = client_with(Device::Up5k, shadow);
    client.write_hex(Region::Spram, 2, 40, "1234 5678").unwrap();
    assert!(client.shadow().has_unsaved_changes());
    client.save_shadow().unwrap();
    assert!(!client.shadow().has_unsaved_changes());

    let (device, _) = client.into_parts();
    let shadow = ShadowMemory::open(Device::Up5k, paths).unwrap();
    let mut client = MemoryClient::new(device, shadow, options()).unwrap();
    assert!(client.verify(Region::Spram, 2, 40, 2).unwrap());
}

#[test]
fn load_shadow_discards_unsaved_writes() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ShadowPaths::new(dir.path().join("data.hex"));
    std::fs::write(paths.bram.as_ref().unwrap(), "00ff\n").unwrap();

    let shadow = ShadowMemory::open(Device::Hx1k, paths).unwrap();
    let mut client = client_with(Device::Hx1k, shadow);
    client.write_hex(Region::Bram, 0, 0, "abcd").unwrap();
    client.load_shadow().unwrap();

    assert_eq!(
        client.shadow().words(Region::Bram, 0, 0, 1).unwrap(),
        words(&["00ff"])
    );
    // Device still holds the write, so the reloaded expectation disagrees
    assert!(!client.verify(Region::Bram, 0, 0, 1).unwrap());
}
