/*
 *  lib.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Polls the outdoor temperature and shows it on an addressable LED strip as
//! a proportional, hue-coded gauge.

pub mod color_map;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod drivers;
pub mod gauge;
pub mod override_file;
pub mod scheduler;
pub mod strip;
pub mod transition;
pub mod weather;
pub mod window;
