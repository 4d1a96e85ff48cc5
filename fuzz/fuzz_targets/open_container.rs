#![no_main]
use formatid::identify::{ContainerArchive, ContainerConfig, Ole2Container, ZipContainer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut doc) = Ole2Container::open(data) {
        let names: Vec<String> = doc.names().map(String::from).collect();
        for name in names {
            let _ = doc.read_entry(&name, 1 << 16);
        }
    }
    if let Ok(mut archive) = ZipContainer::open(data, &ContainerConfig::default()) {
        let names: Vec<String> = archive.names().map(String::from).collect();
        for name in names {
            let _ = archive.read_entry(&name, 1 << 16);
        }
    }
});
