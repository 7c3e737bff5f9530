use crate::error::{CollisionError, Result};
use crate::geometry::{Plane, Polygon};
use crate::utils::binary::{read_u32, read_vec3, write_u32, write_vec3};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Restored polygons with more vertices than this are treated as corrupt.
const MAX_DUMPED_VERTICES: u32 = 1 << 16;

/// Flat convex polygon, typically static world geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    pub polygon: Polygon,
}

impl Default for PolygonShape {
    fn default() -> Self {
        Self {
            polygon: Polygon::new(vec![
                DVec3::new(-1.0, 0.0, -1.0),
                DVec3::new(-1.0, 0.0, 1.0),
                DVec3::new(1.0, 0.0, 1.0),
                DVec3::new(1.0, 0.0, -1.0),
            ]),
        }
    }
}

impl PolygonShape {
    pub fn new(vertices: Vec<DVec3>) -> Self {
        Self {
            polygon: Polygon::new(vertices),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.polygon.is_convex()
    }

    pub fn area(&self) -> f64 {
        self.polygon.area()
    }

    pub(super) fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_u32(writer, self.polygon.len() as u32)?;
        for vertex in self.polygon.vertices() {
            write_vec3(writer, *vertex)?;
        }
        Ok(())
    }

    pub(super) fn restore<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let count = read_u32(reader)?;
        if count > MAX_DUMPED_VERTICES {
            return Err(CollisionError::MalformedDump(format!(
                "polygon claims {count} vertices"
            )));
        }
        let vertices = (0..count)
            .map(|_| read_vec3(reader))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(vertices))
    }
}

/// World-space polygon state cached alongside the shape's bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldPolygon {
    pub polygon: Polygon,
    pub plane: Plane,
    pub center: DVec3,
}

impl WorldPolygon {
    pub(super) fn new(polygon: Polygon) -> Self {
        Self {
            plane: polygon.plane(),
            center: polygon.center(),
            polygon,
        }
    }
}
