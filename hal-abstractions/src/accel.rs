//! Accelerometer register access
//!
//! The engine only needs three primitives: the identity register, a signed
//! 16-bit axis reading and a single register write (used for sleep/wake).

/// Register-level access to an I2C accelerometer
pub trait AccelRegisters {
    /// Bus error
    type Error: core::fmt::Debug;

    /// Read the fixed identity (`WHO_AM_I`) register
    fn read_identity_register(&mut self) -> Result<u8, Self::Error>;

    /// Read a big-endian `i16` from the register pair starting at `offset`
    fn read_axis_register(&mut self, offset: u8) -> Result<i16, Self::Error>;

    /// Write a single register
    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;
}
