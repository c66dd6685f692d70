#![deny(unsafe_code)]
#![deny(warnings)]
//! MPU-6050 register access over I2C

use embedded_hal::i2c::I2c;
use hal_abstractions::AccelRegisters;
use wake_clock_core::config::mpu6050::WHO_AM_I;

/// 7-bit address with AD0 tied low
pub const MPU6050_ADDRESS: u8 = 0x68;

pub struct Mpu6050<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: MPU6050_ADDRESS,
        }
    }
}

impl<I2C: I2c> AccelRegisters for Mpu6050<I2C> {
    type Error = I2C::Error;

    fn read_identity_register(&mut self) -> Result<u8, Self::Error> {
        let mut value = [0u8];
        self.i2c.write_read(self.address, &[WHO_AM_I], &mut value)?;
        Ok(value[0])
    }

    fn read_axis_register(&mut self, offset: u8) -> Result<i16, Self::Error> {
        // High byte first; the register pointer auto-increments
        let mut raw = [0u8; 2];
        self.i2c.write_read(self.address, &[offset], &mut raw)?;
        Ok(i16::from_be_bytes(raw))
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[addr, value])
    }
}
