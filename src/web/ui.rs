use axum::response::Html;

/// Upload page handler
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="id">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>DermaScan</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f2f6fa;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            color: #333;
        }

        .container {
            background: white;
            border-radius: 12px;
            padding: 32px;
            box-shadow: 0 10px 40px rgba(0, 0, 0, 0.08);
            max-width: 720px;
            width: 92%;
        }

        h1 { color: #1f6fb2; margin-bottom: 4px; }
        .subtitle { color: #444; margin-bottom: 24px; }

        .upload-area {
            border: 2px dashed #cbd5e0;
            border-radius: 10px;
            padding: 36px 16px;
            margin: 16px 0;
            text-align: center;
            cursor: pointer;
            background: #f8fafc;
        }

        .upload-area.drag-over { border-color: #1f6fb2; background: #edf2f7; }

        #fileInput { display: none; }

        .options { display: flex; gap: 12px; align-items: center; margin: 12px 0; }

        .btn {
            background: #1f6fb2;
            color: white;
            border: none;
            padding: 12px 24px;
            border-radius: 8px;
            font-size: 1em;
            cursor: pointer;
        }

        .btn:disabled { opacity: 0.6; cursor: not-allowed; }

        .results { margin-top: 24px; display: none; }

        .result-line { margin: 6px 0; }

        .description {
            background: #e8f4fd;
            padding: 15px;
            border-radius: 8px;
            border: 1px solid #b3d7f2;
            max-height: 200px;
            overflow-y: auto;
            font-size: 16px;
            line-height: 1.5;
            text-align: justify;
            margin-top: 12px;
        }

        .annotated { margin-top: 12px; max-width: 100%; border: 2px solid #ddd; border-radius: 10px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>DermaScan</h1>
        <p class="subtitle">Deteksi dan klasifikasi penyakit kulit.</p>

        <p>Unggah gambar kulit yang jelas (JPG/PNG), lalu klik <b>Submit</b> untuk melihat hasil prediksi.</p>

        <div class="upload-area" id="uploadArea">
            <div>&#128194; Klik atau seret gambar ke sini</div>
            <div style="color:#718096;font-size:0.9em;">JPG/PNG, maksimal 20MB</div>
        </div>

        <input type="file" id="fileInput" accept="image/jpeg,image/png">

        <div class="options">
            <label for="variant">Model:</label>
            <select id="variant">
                <option value="detector">Deteksi (YOLO)</option>
                <option value="classifier">Klasifikasi (CNN)</option>
                <option value="forest">Random Forest</option>
            </select>
            <button class="btn" id="processBtn" onclick="processImage()" disabled>&#128269; Submit</button>
        </div>

        <div class="results" id="results">
            <h3>&#128204; Hasil Prediksi</h3>
            <div class="result-line"><b>Nama Penyakit:</b> <span id="label"></span></div>
            <div class="result-line"><b>Akurasi:</b> <span id="confidence"></span></div>
            <div class="result-line"><b>Waktu Prediksi:</b> <span id="latency"></span></div>
            <div class="description" id="description"></div>
            <img class="annotated" id="annotated" style="display:none;">
        </div>
    </div>

    <script>
        const uploadArea = document.getElementById('uploadArea');
        const fileInput = document.getElementById('fileInput');
        const processBtn = document.getElementById('processBtn');
        const results = document.getElementById('results');

        let selectedFile = null;

        uploadArea.addEventListener('click', () => fileInput.click());
        fileInput.addEventListener('change', (e) => handleFile(e.target.files[0]));

        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('drag-over');
        });
        uploadArea.addEventListener('dragleave', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('drag-over');
        });
        uploadArea.addEventListener('drop', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('drag-over');
            handleFile(e.dataTransfer.files[0]);
        });

        function handleFile(file) {
            if (!file) return;
            if (!['image/jpeg', 'image/png'].includes(file.type)) {
                alert('Hanya format JPG/PNG yang didukung.');
                return;
            }
            selectedFile = file;
            uploadArea.innerHTML = '&#9989; ' + file.name;
            processBtn.disabled = false;
        }

        async function processImage() {
            if (!selectedFile) return;

            processBtn.disabled = true;
            results.style.display = 'none';

            try {
                const formData = new FormData();
                formData.append('file', selectedFile);
                formData.append('variant', document.getElementById('variant').value);

                const response = await fetch('/predict/upload', { method: 'POST', body: formData });
                const result = await response.json();

                if (!response.ok || !result.success) {
                    throw new Error((result.error && result.error.message) || 'Prediksi gagal');
                }

                const d = result.data;
                document.getElementById('label').textContent = d.label;
                document.getElementById('confidence').textContent =
                    d.confidence_pct != null ? d.confidence_pct.toFixed(2) + '%' : '-';
                document.getElementById('latency').textContent = d.latency_ms.toFixed(2) + ' ms';
                document.getElementById('description').textContent = d.description;

                const annotated = document.getElementById('annotated');
                if (d.annotated) {
                    annotated.src = '/predict/annotated?t=' + Date.now();
                    annotated.style.display = 'block';
                } else {
                    annotated.style.display = 'none';
                }

                results.style.display = 'block';
            } catch (error) {
                alert('Gagal: ' + error.message);
            } finally {
                processBtn.disabled = false;
            }
        }
    </script>
</body>
</html>"#;
