use ndarray::Array2;

/// Validate a single-channel audio buffer.
///
/// # Arguments
/// * `y` - Audio samples to validate
///
/// # Returns
/// `Ok(())` if the buffer is non-empty and every sample is finite
///
/// # Example
/// ```
/// use repet::utils::valid_audio;
///
/// assert!(valid_audio(&[0.0, 0.5, -0.5]).is_ok());
/// assert!(valid_audio(&[]).is_err());
/// ```
pub fn valid_audio(y: &[f32]) -> crate::Result<()> {
    if y.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }

    if !y.iter().all(|&v| v.is_finite()) {
        return Err(crate::Error::NonFiniteAudio);
    }

    Ok(())
}

/// Validate a multichannel audio buffer (channels x samples).
///
/// # Example
/// ```
/// use repet::utils::valid_audio_2d;
/// use ndarray::Array2;
///
/// let y = Array2::from_shape_vec((2, 4), vec![0.0, 0.5, -0.5, 0.0, 0.1, 0.2, -0.1, -0.2]).unwrap();
/// assert!(valid_audio_2d(&y).is_ok());
/// ```
pub fn valid_audio_2d(y: &Array2<f32>) -> crate::Result<()> {
    if y.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }

    if !y.iter().all(|&v| v.is_finite()) {
        return Err(crate::Error::NonFiniteAudio);
    }

    Ok(())
}
