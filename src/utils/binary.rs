//! Little-endian read/write helpers used by the debug dump format.

use glam::DVec3;
use std::io::{Read, Write};

pub fn write_u32<W: Write + ?Sized>(writer: &mut W, value: u32) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_f64<W: Write + ?Sized>(writer: &mut W, value: f64) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_vec3<W: Write + ?Sized>(writer: &mut W, value: DVec3) -> std::io::Result<()> {
    write_f64(writer, value.x)?;
    write_f64(writer, value.y)?;
    write_f64(writer, value.z)
}

pub fn read_u32<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn read_f64<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<f64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

pub fn read_vec3<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<DVec3> {
    let x = read_f64(reader)?;
    let y = read_f64(reader)?;
    let z = read_f64(reader)?;
    Ok(DVec3::new(x, y, z))
}
