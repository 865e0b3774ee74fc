#![no_main]

use ferrous_kernel::{Container, Resolver};
use libfuzzer_sys::fuzz_target;

// Byte-driven registration and resolution, including alias chains that
// may form cycles. Every outcome must be an error value, never a panic.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let container = Container::new();
    let ids: Vec<String> = (0..8).map(|i| format!("svc{i}")).collect();

    for chunk in data.chunks(2) {
        let target = (chunk[0] % 8) as usize;
        let source = (chunk.get(1).copied().unwrap_or(0) % 8) as usize;
        match chunk[0] % 4 {
            0 => {
                container.instance(ids[target].as_str(), target as u32);
            }
            1 => {
                let value = source as u32;
                container.singleton(ids[target].as_str(), move |_| Ok(value));
            }
            2 => {
                container.alias(ids[target].as_str(), ids[source].as_str());
            }
            _ => {
                container.set_param(ids[target].clone(), source as u64);
            }
        }
    }

    for id in &ids {
        let _ = container.get::<u32>(id.as_str());
        let _ = container.param(id);
    }
    assert!(container.resolving().is_empty());
});
