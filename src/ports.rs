use crate::utils::error::{LoggerError, LoggerResult};
use serialport::{available_ports, SerialPortInfo, SerialPortType};
use std::io::Write;

pub fn describe_port(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let mut line = format!("{} usb {:04x}:{:04x}", info.port_name, usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                line.push(' ');
                line.push_str(product);
            }
            line
        }
        SerialPortType::PciPort => format!("{} pci", info.port_name),
        SerialPortType::BluetoothPort => format!("{} bluetooth", info.port_name),
        SerialPortType::Unknown => info.port_name.clone(),
    }
}

pub fn list_ports<W: Write>(out: &mut W) -> LoggerResult<usize> {
    let ports = available_ports().map_err(LoggerError::ListPorts)?;
    if ports.is_empty() {
        writeln!(out, "No serial ports found")?;
    }
    for info in &ports {
        writeln!(out, "{}", describe_port(info))?;
    }
    Ok(ports.len())
}
