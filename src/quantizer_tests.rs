#[cfg(test)]
mod tests {
    use super::super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rgb::RGBA8;

    fn create_test_raster(width: u32, height: u32, pixels: Vec<RGBA8>) -> Raster {
        Raster::new(width, height, pixels).unwrap()
    }

    fn create_gradient_raster(width: u32, height: u32) -> Raster {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let b = 128;
                pixels.push(RGBA8::new(r, g, b, 255));
            }
        }
        create_test_raster(width, height, pixels)
    }

    fn options(target_colors: usize, algorithm: QuantizeAlgorithm) -> QuantizeOptions {
        QuantizeOptions {
            target_colors,
            algorithm,
            ..Default::default()
        }
    }

    const ALGORITHMS: [QuantizeAlgorithm; 3] = [
        QuantizeAlgorithm::MedianCut,
        QuantizeAlgorithm::KMeans,
        QuantizeAlgorithm::Octree,
    ];

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "median_cut".parse::<QuantizeAlgorithm>().unwrap(),
            QuantizeAlgorithm::MedianCut
        );
        assert_eq!(
            "kmeans".parse::<QuantizeAlgorithm>().unwrap(),
            QuantizeAlgorithm::KMeans
        );
        assert_eq!(
            "octree".parse::<QuantizeAlgorithm>().unwrap(),
            QuantizeAlgorithm::Octree
        );
        assert!(matches!(
            "popularity".parse::<QuantizeAlgorithm>(),
            Err(EngineError::Validation { parameter: "algorithm", .. })
        ));
    }

    #[test]
    fn test_rejects_target_out_of_range() {
        let img = create_gradient_raster(8, 8);
        let mut rng = StdRng::seed_from_u64(0);
        for target in [0, 1, 257] {
            let result = quantize(&img, &options(target, QuantizeAlgorithm::MedianCut), &mut rng);
            assert!(matches!(result, Err(EngineError::Validation { .. })));
        }
    }

    #[test]
    fn test_each_algorithm_respects_target() {
        let img = create_gradient_raster(50, 50);
        for algorithm in ALGORITHMS {
            let mut rng = StdRng::seed_from_u64(42);
            let result = quantize(&img, &options(8, algorithm), &mut rng).unwrap();
            assert!(result.palette.len() <= 8, "{} gave {}", algorithm, result.palette.len());
            assert!(!result.palette.is_empty());
        }
    }

    #[test]
    fn test_median_cut_reaches_exact_target() {
        let img = create_gradient_raster(50, 50);
        let mut rng = StdRng::seed_from_u64(0);
        let result = quantize(&img, &options(8, QuantizeAlgorithm::MedianCut), &mut rng).unwrap();
        assert_eq!(result.palette.len(), 8);
    }

    #[test]
    fn test_target_capped_to_distinct_colors_never_padded() {
        let colors = [
            RGBA8::new(255, 0, 0, 255),
            RGBA8::new(0, 255, 0, 255),
            RGBA8::new(0, 0, 255, 255),
        ];
        let pixels: Vec<RGBA8> = (0..36).map(|i| colors[i % 3]).collect();
        let img = create_test_raster(6, 6, pixels);

        for algorithm in ALGORITHMS {
            let mut rng = StdRng::seed_from_u64(9);
            let result = quantize(&img, &options(16, algorithm), &mut rng).unwrap();
            assert_eq!(result.palette.len(), 3, "{}", algorithm);
            for c in &colors {
                assert!(result.palette.contains(c), "{} missing {:?}", algorithm, c);
            }
            assert_eq!(result.original_color_count, 3);
        }
    }

    #[test]
    fn test_single_color_raster() {
        let img = create_test_raster(10, 10, vec![RGBA8::new(255, 0, 0, 255); 100]);
        let mut rng = StdRng::seed_from_u64(0);
        let result = quantize(&img, &options(16, QuantizeAlgorithm::MedianCut), &mut rng).unwrap();
        assert_eq!(result.palette, vec![RGBA8::new(255, 0, 0, 255)]);
        assert_eq!(result.original_color_count, 1);
    }

    #[test]
    fn test_transparent_entry_prepended() {
        let mut pixels = vec![RGBA8::new(0, 0, 0, 0); 50];
        pixels.extend(vec![RGBA8::new(200, 40, 40, 255); 25]);
        pixels.extend(vec![RGBA8::new(40, 40, 200, 255); 25]);
        let img = create_test_raster(10, 10, pixels);

        let mut rng = StdRng::seed_from_u64(0);
        let result = quantize(&img, &options(4, QuantizeAlgorithm::Octree), &mut rng).unwrap();
        assert_eq!(result.palette[0], RGBA8::new(0, 0, 0, 0));
        assert_eq!(result.palette.len(), 3);
        assert_eq!(result.original_color_count, 2);
    }

    #[test]
    fn test_without_preserving_transparency_counts_all_colors() {
        let mut pixels = vec![RGBA8::new(0, 0, 0, 0); 50];
        pixels.extend(vec![RGBA8::new(200, 40, 40, 255); 50]);
        let img = create_test_raster(10, 10, pixels);

        let opts = QuantizeOptions {
            target_colors: 4,
            preserve_transparency: false,
            ..Default::default()
        };
        let result = quantize(&img, &opts, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(result.original_color_count, 2);
        // Transparent pixels take part like any other color, alpha included.
        assert_eq!(result.palette.len(), 2);
        assert!(result.palette.contains(&RGBA8::new(0, 0, 0, 0)));
        assert!(result.palette.contains(&RGBA8::new(200, 40, 40, 255)));
    }

    #[test]
    fn test_transparent_entry_counts_toward_target() {
        // 1024 distinct opaque colors, one pixel fully transparent.
        let mut pixels: Vec<RGBA8> = (0..1024u32)
            .map(|i| RGBA8::new((i % 32 * 8) as u8, (i / 32 * 8) as u8, 100, 255))
            .collect();
        pixels[0] = RGBA8::new(0, 0, 0, 0);
        let img = create_test_raster(32, 32, pixels);

        for algorithm in ALGORITHMS {
            let mut rng = StdRng::seed_from_u64(3);
            let result = quantize(&img, &options(256, algorithm), &mut rng).unwrap();
            assert!(result.palette.len() <= 256, "{} gave {}", algorithm, result.palette.len());
            assert_eq!(result.palette[0], RGBA8::new(0, 0, 0, 0));
            assert_eq!(result.palette.iter().filter(|c| c.a == 0).count(), 1);
        }

        let mut rng = StdRng::seed_from_u64(3);
        let result = quantize(&img, &options(256, QuantizeAlgorithm::MedianCut), &mut rng).unwrap();
        assert_eq!(result.palette.len(), 256);
    }

    #[test]
    fn test_alpha_only_differences_share_an_entry_with_mean_alpha() {
        let pixels = vec![
            RGBA8::new(10, 20, 30, 255),
            RGBA8::new(10, 20, 30, 128),
            RGBA8::new(10, 20, 30, 255),
            RGBA8::new(10, 20, 30, 128),
        ];
        let img = create_test_raster(2, 2, pixels);

        for algorithm in ALGORITHMS {
            let mut rng = StdRng::seed_from_u64(0);
            let result = quantize(&img, &options(16, algorithm), &mut rng).unwrap();
            // One RGB triple means one entry; its alpha is the floor mean.
            assert_eq!(result.palette, vec![RGBA8::new(10, 20, 30, 191)], "{}", algorithm);
            assert_eq!(result.original_color_count, 2);
        }
    }

    #[test]
    fn test_fully_transparent_raster_is_degenerate() {
        let img = create_test_raster(4, 4, vec![RGBA8::new(0, 0, 0, 0); 16]);
        let result = quantize(&img, &QuantizeOptions::default(), &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(EngineError::DegenerateInput(_))));
    }

    #[test]
    fn test_original_count_uses_full_raster() {
        // 200x100 is sampled, but every pixel's color still counts.
        let img = create_gradient_raster(200, 100);
        let expected = count_distinct_colors(&img.pixels, true);
        let mut rng = StdRng::seed_from_u64(0);
        let result = quantize(&img, &options(4, QuantizeAlgorithm::MedianCut), &mut rng).unwrap();
        assert_eq!(result.original_color_count, expected);
    }

    #[test]
    fn test_bucket_range_sums_channels() {
        let colors = vec![RGBA8::new(0, 10, 20, 255), RGBA8::new(100, 30, 20, 255)];
        assert_eq!(bucket_range(&colors), 120);
        assert_eq!(bucket_range(&[]), 0);
    }

    #[test]
    fn test_bucket_average() {
        let colors = vec![RGBA8::new(0, 0, 0, 255), RGBA8::new(255, 255, 255, 255)];
        assert_eq!(bucket_average(&colors), RGBA8::new(127, 127, 127, 255));
        let translucent = vec![RGBA8::new(0, 0, 0, 255), RGBA8::new(0, 0, 0, 100)];
        assert_eq!(bucket_average(&translucent), RGBA8::new(0, 0, 0, 177));
        assert_eq!(bucket_average(&[]), RGBA8::new(0, 0, 0, 255));
    }

    #[test]
    fn test_split_bucket_on_widest_channel() {
        let colors = vec![
            RGBA8::new(0, 128, 128, 255),
            RGBA8::new(255, 128, 128, 255),
            RGBA8::new(100, 128, 128, 255),
            RGBA8::new(200, 128, 128, 255),
        ];
        let (left, right) = split_bucket(colors).unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
        assert!(left.iter().all(|c| c.r <= 100));
        assert!(right.iter().all(|c| c.r >= 200));
    }

    #[test]
    fn test_split_bucket_keeps_duplicates_together() {
        let a = RGBA8::new(10, 10, 10, 255);
        let b = RGBA8::new(90, 10, 10, 255);
        let (left, right) = split_bucket(vec![a, a, a, b]).unwrap();
        assert_eq!(left, vec![a, a, a]);
        assert_eq!(right, vec![b]);
    }

    #[test]
    fn test_split_bucket_zero_range() {
        let c = RGBA8::new(5, 5, 5, 255);
        assert!(split_bucket(vec![c; 4]).is_none());
    }
}
