//! Fixed-point trigonometry for waveform and direction evaluation.

/// Quarter-wave sine table: `round(sin(deg) * 0x7fff)` for 0..=90 degrees.
const SIN_QUARTER: [i16; 91] = [
    0, 572, 1144, 1715, 2286, 2856, 3425, 3993, 4560, 5126, //
    5690, 6252, 6813, 7371, 7927, 8481, 9032, 9580, 10126, 10668, //
    11207, 11743, 12275, 12803, 13328, 13848, 14364, 14876, 15383, 15886, //
    16383, 16876, 17364, 17846, 18323, 18794, 19260, 19720, 20173, 20621, //
    21062, 21497, 21925, 22347, 22762, 23170, 23571, 23964, 24351, 24730, //
    25101, 25465, 25821, 26169, 26509, 26841, 27165, 27481, 27788, 28087, //
    28377, 28659, 28932, 29196, 29451, 29697, 29934, 30162, 30381, 30591, //
    30791, 30982, 31163, 31335, 31498, 31650, 31794, 31927, 32051, 32165, //
    32269, 32364, 32448, 32523, 32587, 32642, 32687, 32722, 32747, 32762, //
    32767,
];

/// Fixed-point sine of an angle in whole degrees, in the range
/// `-0x7fff..=0x7fff`. The angle is reduced modulo 360 first.
pub fn fixp_sin16(degrees: i32) -> i32 {
    let d = degrees.rem_euclid(360) as usize;
    match d {
        0..=90 => i32::from(SIN_QUARTER[d]),
        91..=180 => i32::from(SIN_QUARTER[180 - d]),
        181..=270 => -i32::from(SIN_QUARTER[d - 180]),
        _ => -i32::from(SIN_QUARTER[360 - d]),
    }
}

/// Directional gain for an effect direction given in fixed-point turns
/// (0x10000 = 360°). Direction 0 yields full-scale positive gain.
pub fn direction_gain(direction: u16) -> i32 {
    let degrees = (u32::from(direction) * 360 / 0x10000) as i32;
    fixp_sin16(90 + degrees)
}
