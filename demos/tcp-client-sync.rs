// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poll the configured register blocks of a device once.
//!
//! Usage: `cargo run --example tcp-client-sync -- 192.168.0.222 [unit]`

use blocking_modbus::{
    client::util::words_from_bytes,
    prelude::*,
    RegisterBlock,
};

fn poll<T: Transport>(
    session: &mut Session<T>,
    unit: Unit,
    blocks: &[RegisterBlock],
    mut sink: impl FnMut(&str, &[u16]),
) -> Result<(), Error> {
    for block in blocks {
        match session.read_registers(unit, block.kind, block.address, block.count) {
            Ok(data) => sink(&block.name, &words_from_bytes(&data)),
            // The device rejected this block, continue with the next one.
            Err(Error::ProtocolException(rsp)) => {
                log::warn!("Failed to read {}: {rsp}", block.name);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.0.222".to_owned());
    let mut device = DeviceConfig::new(host);
    if let Some(unit) = args.next() {
        device.unit = unit.parse()?;
    }
    device.registers = vec![
        RegisterBlock {
            name: "serial_number".to_owned(),
            kind: RegisterKind::Input,
            address: 0x1000,
            count: 7,
        },
        RegisterBlock {
            name: "setpoint".to_owned(),
            kind: RegisterKind::Holding,
            address: 300,
            count: 1,
        },
    ];

    let mut session = device.connect()?;
    poll(&mut session, device.unit, &device.registers, |name, words| {
        println!("{name}: {words:?}");
    })?;
    session.disconnect()?;
    Ok(())
}
